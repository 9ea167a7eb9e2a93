/// Natural logarithm of `z!`.
pub fn ln_factorial(z: usize) -> f64 {
    (2..=z).map(|i| (i as f64).ln()).sum()
}

/// Natural logarithm of the Poisson probability mass `P(N = z)` for `N ~ Poisson(lambda)`.
pub fn ln_pmf(z: usize, lambda: f64) -> f64 {
    if lambda == 0.0 {
        return if z == 0 { 0.0 } else { f64::NEG_INFINITY };
    }

    -lambda + (z as f64) * lambda.ln() - ln_factorial(z)
}

pub fn pmf(z: usize, lambda: f64) -> f64 {
    ln_pmf(z, lambda).exp()
}

/// `P(N <= z)`.
pub fn cdf(z: usize, lambda: f64) -> f64 {
    (0..=z).map(|i| pmf(i, lambda)).sum::<f64>().min(1.0)
}

/// Normalizes log-weights into probabilities, shifting by the maximum so that
/// large exponents neither overflow nor underflow to an all-zero vector.
pub fn normalize_ln_weights(ln_weights: &[f64]) -> Vec<f64> {
    let max = ln_weights
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);

    if max == f64::NEG_INFINITY {
        return vec![0.0; ln_weights.len()];
    }

    let weights = ln_weights
        .iter()
        .map(|&w| (w - max).exp())
        .collect::<Vec<_>>();
    let total: f64 = weights.iter().sum();

    weights.into_iter().map(|w| w / total).collect()
}
