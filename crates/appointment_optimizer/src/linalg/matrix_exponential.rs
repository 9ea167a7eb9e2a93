//! Matrix exponential by scaling and squaring with Padé approximants, following
//! Higham, "The Scaling and Squaring Method for the Matrix Exponential Revisited" (2005).

use ndarray::{Array2, ArrayView2};

use super::lu;

const THETA_3: f64 = 1.495585217958292e-2;
const THETA_5: f64 = 2.539398330063230e-1;
const THETA_7: f64 = 9.504178996162932e-1;
const THETA_9: f64 = 2.097847961257068e0;
const THETA_13: f64 = 5.371920351148152e0;

const PADE_3: [f64; 4] = [120.0, 60.0, 12.0, 1.0];
const PADE_5: [f64; 6] = [30240.0, 15120.0, 3360.0, 420.0, 30.0, 1.0];
const PADE_7: [f64; 8] = [
    17297280.0, 8648640.0, 1995840.0, 277200.0, 25200.0, 1512.0, 56.0, 1.0,
];
const PADE_9: [f64; 10] = [
    17643225600.0,
    8821612800.0,
    2075673600.0,
    302702400.0,
    30270240.0,
    2162160.0,
    110880.0,
    3960.0,
    90.0,
    1.0,
];
const PADE_13: [f64; 14] = [
    64764752532480000.0,
    32382376266240000.0,
    7771770303897600.0,
    1187353796428800.0,
    129060195264000.0,
    10559470521600.0,
    670442572800.0,
    33522128640.0,
    1323241920.0,
    40840800.0,
    960960.0,
    16380.0,
    182.0,
    1.0,
];

/// Maximum absolute column sum.
pub fn one_norm(matrix: &ArrayView2<f64>) -> f64 {
    matrix
        .columns()
        .into_iter()
        .map(|column| column.iter().map(|v| v.abs()).sum::<f64>())
        .fold(0.0, f64::max)
}

/// `exp(matrix * t)`.
pub fn expm_scaled(matrix: &ArrayView2<f64>, t: f64) -> Array2<f64> {
    if t == 0.0 {
        return Array2::eye(matrix.nrows());
    }

    expm(&(matrix * t).view())
}

pub fn expm(matrix: &ArrayView2<f64>) -> Array2<f64> {
    let n = matrix.nrows();
    debug_assert_eq!(n, matrix.ncols());

    if n == 0 {
        return Array2::zeros((0, 0));
    }

    let norm = one_norm(matrix);
    if norm == 0.0 {
        return Array2::eye(n);
    }

    let identity = Array2::<f64>::eye(n);

    for (theta, coefficients) in [
        (THETA_3, &PADE_3[..]),
        (THETA_5, &PADE_5[..]),
        (THETA_7, &PADE_7[..]),
        (THETA_9, &PADE_9[..]),
    ] {
        if norm <= theta {
            let (u, v) = pade_low_degree(matrix, &identity, coefficients);
            return pade_quotient(&u, &v);
        }
    }

    let squarings = (norm / THETA_13).log2().ceil().max(0.0) as i32;
    let scaled = matrix.to_owned() / 2.0_f64.powi(squarings);
    let (u, v) = pade_13(&scaled.view(), &identity);

    let mut result = pade_quotient(&u, &v);
    for _ in 0..squarings {
        result = result.dot(&result);
    }

    result
}

fn pade_low_degree(
    matrix: &ArrayView2<f64>,
    identity: &Array2<f64>,
    coefficients: &[f64],
) -> (Array2<f64>, Array2<f64>) {
    let a2 = matrix.dot(matrix);

    // even powers I, A^2, A^4, ...
    let mut powers = vec![identity.clone()];
    while powers.len() * 2 < coefficients.len() {
        let next = powers[powers.len() - 1].dot(&a2);
        powers.push(next);
    }

    let mut odd = Array2::<f64>::zeros(identity.raw_dim());
    let mut even = Array2::<f64>::zeros(identity.raw_dim());
    for (j, power) in powers.iter().enumerate() {
        even.scaled_add(coefficients[2 * j], power);
        if 2 * j + 1 < coefficients.len() {
            odd.scaled_add(coefficients[2 * j + 1], power);
        }
    }

    (matrix.dot(&odd), even)
}

fn pade_13(matrix: &ArrayView2<f64>, identity: &Array2<f64>) -> (Array2<f64>, Array2<f64>) {
    let b = &PADE_13;
    let a2 = matrix.dot(matrix);
    let a4 = a2.dot(&a2);
    let a6 = a4.dot(&a2);

    let inner_u = &a6 * b[13] + &a4 * b[11] + &a2 * b[9];
    let outer_u = a6.dot(&inner_u) + &a6 * b[7] + &a4 * b[5] + &a2 * b[3] + identity * b[1];
    let u = matrix.dot(&outer_u);

    let inner_v = &a6 * b[12] + &a4 * b[10] + &a2 * b[8];
    let v = a6.dot(&inner_v) + &a6 * b[6] + &a4 * b[4] + &a2 * b[2] + identity * b[0];

    (u, v)
}

/// `(V - U)^-1 (V + U)`.
fn pade_quotient(u: &Array2<f64>, v: &Array2<f64>) -> Array2<f64> {
    let numerator = v + u;
    let denominator = v - u;

    // V - U is nonsingular for the norm bounds above
    lu::solve(&denominator, &numerator).unwrap_or(numerator)
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::test_utils::assert_matrix_close;

    #[test]
    fn test_zero_is_identity() {
        let a = array![[-1.0, 1.0], [0.0, -2.0]];

        assert_eq!(expm_scaled(&a.view(), 0.0), Array2::<f64>::eye(2));
        assert_eq!(
            expm(&Array2::<f64>::zeros((3, 3)).view()),
            Array2::<f64>::eye(3)
        );
    }

    #[test]
    fn test_diagonal() {
        for scale in [0.001_f64, 0.1, 1.0, 4.0, 30.0] {
            let a = array![[-1.0, 0.0], [0.0, -0.5]];
            let result = expm_scaled(&a.view(), scale);
            let expected = array![[(-scale).exp(), 0.0], [0.0, (-0.5 * scale).exp()]];

            assert_matrix_close(&result, &expected, 1e-12);
        }
    }

    #[test]
    fn test_upper_triangular_erlang_block() {
        // exp([[-m, m], [0, -m]] t) = e^{-mt} [[1, mt], [0, 1]]
        for t in [0.05_f64, 0.7, 3.0, 12.0] {
            let m: f64 = 1.7;
            let a = array![[-m, m], [0.0, -m]];
            let decay = (-m * t).exp();
            let expected = array![[decay, m * t * decay], [0.0, decay]];

            assert_matrix_close(&expm_scaled(&a.view(), t), &expected, 1e-12);
        }
    }

    #[test]
    fn test_rotation() {
        let theta: f64 = 2.5;
        let a = array![[0.0, -theta], [theta, 0.0]];
        let expected = array![[theta.cos(), -theta.sin()], [theta.sin(), theta.cos()]];

        assert_matrix_close(&expm(&a.view()), &expected, 1e-12);
    }
}
