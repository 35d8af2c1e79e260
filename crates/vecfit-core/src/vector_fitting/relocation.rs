//! Pole relocation
//!
//! The zeros of the weighting function Sigma become the next poles. They are
//! the eigenvalues of `H = A - b r^T / d` where `(A, b, r^T, d)` is a real
//! state-space realization of Sigma.

use ndarray::{Array1, Array2};
use num_complex::Complex64;

use super::constants::{REAL_POLE_TOLERANCE, RELAXATION_TOLERANCE};
use super::poles::{HalfModel, PoleSet};
use crate::error::Result;
use crate::math::linalg;

/// Compute the relocated poles from the Sigma residues of `half`
///
/// `omega_max` is the largest normalized angular frequency; eigenvalues whose
/// imaginary part is below `REAL_POLE_TOLERANCE * omega_max` are taken as
/// real. Real and complex counts of the result follow the eigenvalues, so they
/// may differ from the input.
pub fn relocate_poles(half: &HalfModel, omega_max: f64) -> Result<PoleSet> {
    let n_real = half.real.len();
    let n = n_real + 2 * half.complex.len();
    if n == 0 {
        return Ok(PoleSet::default());
    }

    let mut a = Array2::<f64>::zeros((n, n));
    let mut b = Array1::<f64>::zeros(n);
    let mut r = Array1::<f64>::zeros(n);

    for (i, rec) in half.real.iter().enumerate() {
        a[[i, i]] = rec.pole.re;
        b[i] = 1.0;
        r[i] = rec.sigma.re;
    }
    for (i, rec) in half.complex.iter().enumerate() {
        let j = n_real + 2 * i;
        let p = rec.pole;
        a[[j, j]] = p.re;
        a[[j + 1, j + 1]] = p.re;
        a[[j, j + 1]] = p.im;
        a[[j + 1, j]] = -p.im;
        b[j] = 2.0;
        r[j] = rec.sigma.re;
        r[j + 1] = rec.sigma.im;
    }

    let scale = match half.d_relax {
        Some(d) => 1.0 / clamp_relaxation(d),
        None => 1.0,
    };

    // H = A - b r^T * scale
    for i in 0..n {
        if b[i] == 0.0 {
            continue;
        }
        for k in 0..n {
            a[[i, k]] -= b[i] * r[k] * scale;
        }
    }

    let eigenvalues = linalg::eigenvalues(&a)?;
    Ok(partition(eigenvalues, REAL_POLE_TOLERANCE * omega_max))
}

/// Keep `d` away from zero while preserving its sign
fn clamp_relaxation(d: f64) -> f64 {
    if d.abs() < RELAXATION_TOLERANCE {
        if d < 0.0 {
            -RELAXATION_TOLERANCE
        } else {
            RELAXATION_TOLERANCE
        }
    } else {
        d
    }
}

/// Split eigenvalues into real poles and representatives of conjugate pairs
///
/// Both groups are sorted by magnitude of their imaginary part and then their
/// real part so that the pole order is deterministic.
fn partition(eigenvalues: Vec<Complex64>, imag_tol: f64) -> PoleSet {
    let mut real = Vec::new();
    let mut complex = Vec::new();

    for ev in eigenvalues {
        if ev.im.abs() < imag_tol || ev.im == 0.0 {
            real.push(ev.re);
        } else if ev.im > 0.0 {
            complex.push(ev);
        }
    }

    real.sort_by(|x, y| y.total_cmp(x));
    complex.sort_by(|x, y| x.im.total_cmp(&y.im).then(y.re.total_cmp(&x.re)));

    PoleSet::from_parts(real, complex)
}
