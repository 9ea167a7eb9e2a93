use jiff::SpanRelativeTo;

pub fn parse_duration(input: &str) -> Result<jiff::SignedDuration, String> {
    if let Ok(duration) = input.parse::<jiff::SignedDuration>() {
        return Ok(duration);
    }

    if let Ok(duration) = input
        .parse::<jiff::Span>()
        .and_then(|span| span.to_duration(SpanRelativeTo::days_are_24_hours()))
    {
        return Ok(duration);
    }

    if let Ok(seconds) = input.parse::<f64>() {
        return jiff::SignedDuration::try_from_secs_f64(seconds.abs())
            .map_err(|error| error.to_string());
    }

    Err(format!("invalid duration `{input}`"))
}

/// Parses a list of decimal literals such as `1, 0.5 .5` or `(1e-3, 2)`.
///
/// Commas and whitespace separate the values, the whole list may be wrapped in
/// one pair of parentheses or brackets. Anything else is rejected, the input is
/// never evaluated.
pub fn parse_number_list(input: &str) -> Result<Vec<f64>, String> {
    let trimmed = input.trim();
    let inner = strip_delimiters(trimmed)?;

    let mut values = Vec::new();
    for part in inner.split(',') {
        let part = part.trim();
        if part.is_empty() {
            return Err(format!("empty value in `{input}`"));
        }

        for token in part.split_whitespace() {
            values.push(parse_decimal(token)?);
        }
    }

    Ok(values)
}

fn strip_delimiters(input: &str) -> Result<&str, String> {
    let mut chars = input.chars();
    let (first, last) = (chars.next(), chars.next_back());

    match (first, last) {
        (Some('('), Some(')')) | (Some('['), Some(']')) => Ok(&input[1..input.len() - 1]),
        (Some('(' | '['), _) | (_, Some(')' | ']')) => {
            Err(format!("unbalanced delimiters in `{input}`"))
        }
        _ => Ok(input),
    }
}

fn parse_decimal(token: &str) -> Result<f64, String> {
    if !is_decimal_literal(token) {
        return Err(format!("`{token}` is not a decimal number"));
    }

    token
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| format!("`{token}` is out of range"))
}

/// `[+-]? (digits [. digits?] | . digits) ([eE] [+-]? digits)?`
fn is_decimal_literal(token: &str) -> bool {
    let bytes = token.as_bytes();
    let mut position = 0;

    let skip_sign = |position: &mut usize| {
        if matches!(bytes.get(*position), Some(b'+' | b'-')) {
            *position += 1;
        }
    };
    let count_digits = |position: &mut usize| {
        let start = *position;
        while bytes.get(*position).is_some_and(u8::is_ascii_digit) {
            *position += 1;
        }
        *position - start
    };

    skip_sign(&mut position);
    let mut mantissa_digits = count_digits(&mut position);
    if bytes.get(position) == Some(&b'.') {
        position += 1;
        mantissa_digits += count_digits(&mut position);
    }
    if mantissa_digits == 0 {
        return false;
    }

    if matches!(bytes.get(position), Some(b'e' | b'E')) {
        position += 1;
        skip_sign(&mut position);
        if count_digits(&mut position) == 0 {
            return false;
        }
    }

    position == bytes.len()
}
