use ndarray::Array2;

/// LU decomposition with partial pivoting, `P * A = L * U`, stored in place.
pub struct LuDecomposition {
    lu: Array2<f64>,
    pivots: Vec<usize>,
}

impl LuDecomposition {
    /// Returns `None` when the matrix is not square or numerically singular.
    pub fn new(matrix: &Array2<f64>) -> Option<Self> {
        let n = matrix.nrows();
        if matrix.ncols() != n {
            return None;
        }

        let scale = matrix.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        if n > 0 && scale == 0.0 {
            return None;
        }
        let tolerance = f64::EPSILON * scale;

        let mut lu = matrix.to_owned();
        let mut pivots = Vec::with_capacity(n);

        for k in 0..n {
            let mut pivot_row = k;
            let mut pivot_value = lu[[k, k]].abs();
            for i in (k + 1)..n {
                if lu[[i, k]].abs() > pivot_value {
                    pivot_row = i;
                    pivot_value = lu[[i, k]].abs();
                }
            }

            if pivot_value <= tolerance {
                return None;
            }

            if pivot_row != k {
                for j in 0..n {
                    lu.swap([k, j], [pivot_row, j]);
                }
            }
            pivots.push(pivot_row);

            let diagonal = lu[[k, k]];
            for i in (k + 1)..n {
                let factor = lu[[i, k]] / diagonal;
                lu[[i, k]] = factor;
                if factor != 0.0 {
                    for j in (k + 1)..n {
                        lu[[i, j]] -= factor * lu[[k, j]];
                    }
                }
            }
        }

        Some(LuDecomposition { lu, pivots })
    }

    pub fn dim(&self) -> usize {
        self.lu.nrows()
    }

    /// Solves `A * X = rhs`.
    pub fn solve(&self, rhs: &Array2<f64>) -> Array2<f64> {
        let n = self.dim();
        let mut x = rhs.to_owned();
        let cols = x.ncols();

        for (k, &pivot_row) in self.pivots.iter().enumerate() {
            if pivot_row != k {
                for j in 0..cols {
                    x.swap([k, j], [pivot_row, j]);
                }
            }
        }

        // L has a unit diagonal
        for i in 0..n {
            for k in 0..i {
                let factor = self.lu[[i, k]];
                if factor != 0.0 {
                    for j in 0..cols {
                        x[[i, j]] -= factor * x[[k, j]];
                    }
                }
            }
        }

        for i in (0..n).rev() {
            for k in (i + 1)..n {
                let factor = self.lu[[i, k]];
                if factor != 0.0 {
                    for j in 0..cols {
                        x[[i, j]] -= factor * x[[k, j]];
                    }
                }
            }
            let diagonal = self.lu[[i, i]];
            for j in 0..cols {
                x[[i, j]] /= diagonal;
            }
        }

        x
    }

    pub fn inverse(&self) -> Array2<f64> {
        self.solve(&Array2::eye(self.dim()))
    }
}

pub fn inverse(matrix: &Array2<f64>) -> Option<Array2<f64>> {
    LuDecomposition::new(matrix).map(|lu| lu.inverse())
}

pub fn solve(matrix: &Array2<f64>, rhs: &Array2<f64>) -> Option<Array2<f64>> {
    LuDecomposition::new(matrix).map(|lu| lu.solve(rhs))
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::test_utils::assert_matrix_close;

    #[test]
    fn test_inverse() {
        let a = array![[4.0, 7.0, 2.0], [3.0, 6.0, 1.0], [2.0, 5.0, 3.0]];
        let inv = inverse(&a).unwrap();

        assert_matrix_close(&a.dot(&inv), &Array2::eye(3), 1e-12);
        assert_matrix_close(&inv.dot(&a), &Array2::eye(3), 1e-12);
    }

    #[test]
    fn test_requires_pivoting() {
        let a = array![[0.0, 1.0], [1.0, 0.0]];
        let inv = inverse(&a).unwrap();

        assert_matrix_close(&inv, &a, 1e-15);
    }

    #[test]
    fn test_solve() {
        let a = array![[2.0, 1.0], [1.0, 3.0]];
        let b = array![[3.0], [5.0]];
        let x = solve(&a, &b).unwrap();

        assert_matrix_close(&x, &array![[0.8], [1.4]], 1e-12);
    }

    #[test]
    fn test_singular() {
        assert!(inverse(&array![[1.0, 2.0], [2.0, 4.0]]).is_none());
        assert!(inverse(&Array2::zeros((3, 3))).is_none());
        assert!(inverse(&Array2::zeros((2, 3))).is_none());
    }
}
