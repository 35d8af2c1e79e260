//! Linear algebra operations
//!
//! All ndarray <-> nalgebra conversions live here so the fitting code only
//! ever sees `ndarray` arrays. The backend can be swapped without touching
//! callers.

use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2};
use num_complex::Complex64;

use crate::constants::{NEAR_ZERO, SCHUR_BLOCK_TOL};

/// Result of a least squares solve
pub struct LstsqResult {
    pub solution: Array1<f64>,
    /// Number of singular values kept by the solve
    pub rank: usize,
}

// ============================================================================
// Conversion helpers (internal)
// ============================================================================

#[inline]
fn to_na_real(a: &Array2<f64>) -> DMatrix<f64> {
    let (m, n) = a.dim();
    DMatrix::from_fn(m, n, |i, j| a[[i, j]])
}

#[inline]
fn from_na_real(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

#[inline]
fn to_na_complex(a: &Array2<Complex64>) -> DMatrix<Complex64> {
    let (m, n) = a.dim();
    DMatrix::from_fn(m, n, |i, j| a[[i, j]])
}

#[inline]
fn from_na_complex(m: &DMatrix<Complex64>) -> Array2<Complex64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

// ============================================================================
// Least squares
// ============================================================================

/// Solve the least squares problem `Ax = b` using SVD
///
/// Singular values below `max(m, n) * eps * sigma_max` are treated as zero, so
/// a rank deficient system yields the minimum-norm solution instead of an
/// error.
pub fn lstsq(a: &Array2<f64>, b: &Array1<f64>) -> Result<LstsqResult, &'static str> {
    let (m, n) = a.dim();
    if m == 0 || n == 0 {
        return Err("Empty matrix");
    }
    if b.len() != m {
        return Err("Dimension mismatch");
    }

    let svd = to_na_real(a).svd(true, true);
    let sigma_max = svd.singular_values.iter().copied().fold(0.0, f64::max);
    let cutoff = (m.max(n) as f64 * f64::EPSILON * sigma_max).max(NEAR_ZERO);

    let rhs = DVector::from_fn(m, |i, _| b[i]);
    let solution = svd.solve(&rhs, cutoff)?;
    let rank = svd.singular_values.iter().filter(|&&s| s > cutoff).count();

    Ok(LstsqResult {
        solution: solution.iter().copied().collect(),
        rank,
    })
}

// ============================================================================
// QR decomposition
// ============================================================================

/// Reduced QR decomposition, returns `(Q, R)` with `Q` of shape `m x k` and
/// `R` of shape `k x n`, `k = min(m, n)`
pub fn qr(a: &Array2<f64>) -> (Array2<f64>, Array2<f64>) {
    let (m, n) = a.dim();
    if m == 0 || n == 0 {
        return (Array2::zeros((m, 0)), Array2::zeros((0, n)));
    }

    let qr = to_na_real(a).qr();
    (from_na_real(&qr.q()), from_na_real(&qr.r()))
}

/// Orthonormal basis for the column space of `a` (the `Q` factor)
pub fn orthonormalize(a: &Array2<f64>) -> Array2<f64> {
    qr(a).0
}

// ============================================================================
// Eigenvalue decomposition
// ============================================================================

/// Compute the complex eigenvalues of a real square matrix
pub fn eigenvalues(a: &Array2<f64>) -> Result<Vec<Complex64>, &'static str> {
    let (m, n) = a.dim();
    if m != n {
        return Err("Matrix must be square");
    }
    if m == 0 {
        return Ok(Vec::new());
    }

    Ok(to_na_real(a).complex_eigenvalues().iter().copied().collect())
}

/// Compute the (real) eigenvalues of a Hermitian complex matrix
pub fn hermitian_eigenvalues(a: &Array2<Complex64>) -> Result<Vec<f64>, &'static str> {
    let (m, n) = a.dim();
    if m != n {
        return Err("Matrix must be square");
    }
    if m == 0 {
        return Ok(Vec::new());
    }

    Ok(to_na_complex(a)
        .symmetric_eigenvalues()
        .iter()
        .copied()
        .collect())
}

// ============================================================================
// Linear solves and inversion
// ============================================================================

/// Invert a real matrix
///
/// Returns None if the matrix is singular or non-square.
pub fn inv_real(a: &Array2<f64>) -> Option<Array2<f64>> {
    let (m, n) = a.dim();
    if m != n || m == 0 {
        return None;
    }

    to_na_real(a).try_inverse().map(|inv| from_na_real(&inv))
}

/// Solve `A X = B` for complex matrices by LU decomposition
///
/// Returns None if `A` is singular.
pub fn solve_complex(a: &Array2<Complex64>, b: &Array2<Complex64>) -> Option<Array2<Complex64>> {
    let (m, n) = a.dim();
    if m != n || b.nrows() != m {
        return None;
    }
    if m == 0 {
        return Some(Array2::zeros((0, b.ncols())));
    }

    to_na_complex(a)
        .lu()
        .solve(&to_na_complex(b))
        .map(|x| from_na_complex(&x))
}

// ============================================================================
// Sylvester equation
// ============================================================================

/// Solve the Sylvester equation `AX + XB = C`
///
/// `A` is n x n, `B` is m x m and `C` is n x m. Uses a Bartels-Stewart scheme
/// with a real Schur decomposition of `B` only: with `B = V T Vᵀ` and
/// `Y = X V` the columns of `Y` are obtained left to right from
/// `(A + t_jj I) y_j = f_j - Σ_{k<j} t_kj y_k`, and 2x2 diagonal blocks of `T`
/// couple two columns into one `2n x 2n` system.
pub fn solve_sylvester(
    a: &Array2<f64>,
    b: &Array2<f64>,
    c: &Array2<f64>,
) -> Result<Array2<f64>, &'static str> {
    let n = a.nrows();
    let m = b.nrows();
    if a.ncols() != n || b.ncols() != m {
        return Err("Sylvester: A and B must be square");
    }
    if c.dim() != (n, m) {
        return Err("Sylvester: C must be n x m");
    }
    if n == 0 || m == 0 {
        return Ok(Array2::zeros((n, m)));
    }

    let schur = nalgebra::linalg::Schur::try_new(to_na_real(b), f64::EPSILON, 0)
        .ok_or("Sylvester: Schur decomposition did not converge")?;
    let (v, t) = schur.unpack();

    let a_na = to_na_real(a);
    let f = to_na_real(c) * &v;
    let mut y = DMatrix::<f64>::zeros(n, m);

    let mut j = 0;
    while j < m {
        let coupled = j + 1 < m && t[(j + 1, j)].abs() > SCHUR_BLOCK_TOL;

        if !coupled {
            let mut rhs = f.column(j).clone_owned();
            for k in 0..j {
                rhs -= y.column(k) * t[(k, j)];
            }

            let mut lhs = a_na.clone();
            for i in 0..n {
                lhs[(i, i)] += t[(j, j)];
            }
            let col = lhs.lu().solve(&rhs).ok_or("Sylvester: singular shifted system")?;
            y.set_column(j, &col);
            j += 1;
        } else {
            let mut rhs = DVector::<f64>::zeros(2 * n);
            for i in 0..n {
                let mut r0 = f[(i, j)];
                let mut r1 = f[(i, j + 1)];
                for k in 0..j {
                    r0 -= y[(i, k)] * t[(k, j)];
                    r1 -= y[(i, k)] * t[(k, j + 1)];
                }
                rhs[i] = r0;
                rhs[n + i] = r1;
            }

            // [A + t00 I, t10 I; t01 I, A + t11 I] [y_j; y_j+1] = rhs
            let mut lhs = DMatrix::<f64>::zeros(2 * n, 2 * n);
            lhs.view_mut((0, 0), (n, n)).copy_from(&a_na);
            lhs.view_mut((n, n), (n, n)).copy_from(&a_na);
            for i in 0..n {
                lhs[(i, i)] += t[(j, j)];
                lhs[(n + i, n + i)] += t[(j + 1, j + 1)];
                lhs[(i, n + i)] = t[(j + 1, j)];
                lhs[(n + i, i)] = t[(j, j + 1)];
            }

            let sol = lhs.lu().solve(&rhs).ok_or("Sylvester: singular coupled system")?;
            for i in 0..n {
                y[(i, j)] = sol[i];
                y[(i, j + 1)] = sol[n + i];
            }
            j += 2;
        }
    }

    Ok(from_na_real(&(y * v.transpose())))
}
