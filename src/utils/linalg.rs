//! Dense linear algebra on small row-major matrices.

/// Eigen-decomposition of a symmetric matrix.
#[derive(Debug, Clone)]
pub struct SymmetricEigen {
    /// Eigenvalues, sorted in descending order.
    pub values: Vec<f64>,
    /// `vectors[i][j]` is component `i` of the eigenvector for `values[j]`.
    pub vectors: Vec<Vec<f64>>,
}

impl SymmetricEigen {
    /// Eigenvector `j` as an owned column.
    pub fn column(&self, j: usize) -> Vec<f64> {
        self.vectors.iter().map(|row| row[j]).collect()
    }
}

const JACOBI_MAX_SWEEPS: usize = 100;

/// Cyclic Jacobi eigen-decomposition of a symmetric matrix.
///
/// Deterministic: the rotation order is fixed, so identical input always
/// yields identical output. Each eigenvector's sign is normalised so that its
/// largest-magnitude component is positive.
pub fn symmetric_eigen(matrix: &[Vec<f64>]) -> SymmetricEigen {
    let n = matrix.len();
    let mut a: Vec<Vec<f64>> = matrix.to_vec();
    let mut v = identity(n);

    let scale: f64 = a.iter().flatten().map(|x| x * x).sum::<f64>().sqrt();
    let tolerance = 1e-14 * scale.max(f64::MIN_POSITIVE);

    for _ in 0..JACOBI_MAX_SWEEPS {
        let off: f64 = (0..n)
            .flat_map(|i| (0..n).filter(move |&j| j != i).map(move |j| (i, j)))
            .map(|(i, j)| a[i][j] * a[i][j])
            .sum::<f64>()
            .sqrt();
        if off <= tolerance {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a[p][q];
                if apq.abs() <= f64::MIN_POSITIVE {
                    continue;
                }
                let theta = (a[q][q] - a[p][p]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let akp = a[k][p];
                    let akq = a[k][q];
                    a[k][p] = c * akp - s * akq;
                    a[k][q] = s * akp + c * akq;
                }
                for k in 0..n {
                    let apk = a[p][k];
                    let aqk = a[q][k];
                    a[p][k] = c * apk - s * aqk;
                    a[q][k] = s * apk + c * aqk;
                }
                for row in v.iter_mut() {
                    let vkp = row[p];
                    let vkq = row[q];
                    row[p] = c * vkp - s * vkq;
                    row[q] = s * vkp + c * vkq;
                }
            }
        }
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| {
        a[j][j]
            .partial_cmp(&a[i][i])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let values = order.iter().map(|&j| a[j][j]).collect();
    let mut vectors = vec![vec![0.0; n]; n];
    for (dst, &src) in order.iter().enumerate() {
        let pivot = (0..n)
            .max_by(|&x, &y| {
                v[x][src]
                    .abs()
                    .partial_cmp(&v[y][src].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(0);
        let sign = if v[pivot][src] < 0.0 { -1.0 } else { 1.0 };
        for i in 0..n {
            vectors[i][dst] = sign * v[i][src];
        }
    }

    SymmetricEigen { values, vectors }
}

fn identity(n: usize) -> Vec<Vec<f64>> {
    (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect()
}

/// Solve symmetric positive definite system using Cholesky decomposition.
///
/// Solves A @ x = b where A is symmetric positive definite. Returns `None`
/// when A is not positive definite.
pub fn solve_symmetric(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    if n == 0 || a.len() != n {
        return None;
    }

    // Cholesky decomposition A = L @ L'
    let mut l = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }

            if i == j {
                if sum <= 0.0 {
                    return None;
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }

    // Forward substitution: L @ y = b
    let mut y = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[i][j] * y[j];
        }
        y[i] = sum / l[i][i];
    }

    // Backward substitution: L' @ x = y
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= l[j][i] * x[j];
        }
        x[i] = sum / l[i][i];
    }

    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn reconstruct(eig: &SymmetricEigen) -> Vec<Vec<f64>> {
        let n = eig.values.len();
        let mut out = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in 0..n {
                out[i][j] = (0..n)
                    .map(|k| eig.vectors[i][k] * eig.values[k] * eig.vectors[j][k])
                    .sum();
            }
        }
        out
    }

    #[test]
    fn eigen_of_diagonal_matrix_is_sorted() {
        let m = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 3.0, 0.0],
            vec![0.0, 0.0, 2.0],
        ];
        let eig = symmetric_eigen(&m);
        assert_eq!(eig.values, vec![3.0, 2.0, 1.0]);
        assert_eq!(eig.column(0), vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn eigen_of_2x2_known_values() {
        // [[2, 1], [1, 2]] has eigenvalues 3 and 1.
        let m = vec![vec![2.0, 1.0], vec![1.0, 2.0]];
        let eig = symmetric_eigen(&m);
        assert_relative_eq!(eig.values[0], 3.0, epsilon = 1e-12);
        assert_relative_eq!(eig.values[1], 1.0, epsilon = 1e-12);
        let v0 = eig.column(0);
        assert_relative_eq!(v0[0], v0[1], epsilon = 1e-12);
        assert!(v0[0] > 0.0);
    }

    #[test]
    fn eigen_reconstructs_matrix() {
        let m = vec![
            vec![4.0, 1.0, 0.5, 0.2],
            vec![1.0, 3.0, 0.3, 0.1],
            vec![0.5, 0.3, 2.0, 0.7],
            vec![0.2, 0.1, 0.7, 1.0],
        ];
        let eig = symmetric_eigen(&m);
        let back = reconstruct(&eig);
        for i in 0..4 {
            for j in 0..4 {
                assert_relative_eq!(back[i][j], m[i][j], epsilon = 1e-10);
            }
        }
        for w in eig.values.windows(2) {
            assert!(w[0] >= w[1]);
        }
    }

    #[test]
    fn eigenvectors_are_orthonormal() {
        let m = vec![
            vec![2.0, -1.0, 0.0],
            vec![-1.0, 2.0, -1.0],
            vec![0.0, -1.0, 2.0],
        ];
        let eig = symmetric_eigen(&m);
        for a in 0..3 {
            for b in 0..3 {
                let dot: f64 = (0..3).map(|i| eig.vectors[i][a] * eig.vectors[i][b]).sum();
                let expected = if a == b { 1.0 } else { 0.0 };
                assert_relative_eq!(dot, expected, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn solve_symmetric_known_system() {
        // [[4, 2], [2, 3]] x = [2, 1] -> x = [0.5, 0]
        let a = vec![vec![4.0, 2.0], vec![2.0, 3.0]];
        let x = solve_symmetric(&a, &[2.0, 1.0]).unwrap();
        assert_relative_eq!(x[0], 0.5, epsilon = 1e-12);
        assert_relative_eq!(x[1], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn solve_symmetric_rejects_indefinite_matrix() {
        let a = vec![vec![1.0, 2.0], vec![2.0, 1.0]];
        assert!(solve_symmetric(&a, &[1.0, 1.0]).is_none());
        assert!(solve_symmetric(&[], &[]).is_none());
    }
}
