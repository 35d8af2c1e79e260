//! Real state-space realizations of a rational model
//!
//! H(s) = C (sI - A)^-1 B + D + s E
//!
//! The Gilbert realization stacks one copy of the pole blocks per input. The
//! Sylvester realization applies a similarity transform to it that moves the
//! state matrix towards a user-chosen (or generated) pivot matrix.

use ndarray::{Array2, Array3, Axis};
use num_complex::Complex64;
use rand::prelude::*;
use rand::rngs::StdRng;
use std::f64::consts::PI;

use super::constants::PIVOT_DAMPING;
use super::init::linspace;
use super::model::RationalModel;
use crate::error::{Result, VectorFitError};
use crate::math::linalg;

/// State-space matrices (A, B, C, D, E)
#[derive(Debug, Clone)]
pub struct StateSpace {
    pub a: Array2<f64>,
    pub b: Array2<f64>,
    pub c: Array2<f64>,
    pub d: Array2<f64>,
    pub e: Array2<f64>,
}

impl StateSpace {
    /// Number of states
    pub fn order(&self) -> usize {
        self.a.nrows()
    }

    /// Evaluate `C (sI - A)^-1 B + D + sE` at the given frequencies (Hz)
    ///
    /// # Returns
    /// Response matrices [nfreq, n_outputs, n_inputs]
    pub fn evaluate(&self, freqs: &[f64]) -> Result<Array3<Complex64>> {
        let n = self.order();
        let (n_out, n_in) = self.d.dim();
        let to_complex = |x: &f64| Complex64::new(*x, 0.0);
        let b = self.b.map(to_complex);
        let c = self.c.map(to_complex);

        let mut response = Array3::<Complex64>::zeros((freqs.len(), n_out, n_in));
        for (mut h, &freq) in response.outer_iter_mut().zip(freqs) {
            let s = Complex64::new(0.0, 2.0 * PI * freq);

            let mut s_minus_a = self.a.map(|x| -Complex64::new(*x, 0.0));
            for i in 0..n {
                s_minus_a[[i, i]] += s;
            }
            let x = linalg::solve_complex(&s_minus_a, &b)
                .ok_or(VectorFitError::Linalg("sI - A is singular"))?;

            h.assign(&c.dot(&x));
            h.zip_mut_with(&self.d, |h, &d| *h += d);
            h.zip_mut_with(&self.e, |h, &e| *h += s * e);
        }

        Ok(response)
    }
}

/// Options of the Sylvester realization
#[derive(Debug, Clone, Default)]
pub struct SylvesterOptions {
    /// Pivot state matrix; generated from the model poles when None
    pub pivot: Option<Array2<f64>>,
    /// Feedback matrix [n_states, n_inputs]; random orthonormal when None
    pub feedback: Option<Array2<f64>>,
    /// Seed of the random feedback matrix
    pub seed: Option<u64>,
}

/// Sylvester realization together with the matrices that produced it
#[derive(Debug, Clone)]
pub struct SylvesterRealization {
    pub state_space: StateSpace,
    pub pivot: Array2<f64>,
    pub feedback: Array2<f64>,
}

/// Gilbert realization: block-diagonal A repeated for every input
///
/// Fails if the model has a pole-at-origin term or a complex pole that is not
/// directly followed by its conjugate.
pub fn gilbert_realization(model: &RationalModel) -> Result<StateSpace> {
    if model.pole_at_origin().is_some() {
        return Err(VectorFitError::PoleAtOrigin("Gilbert"));
    }

    let poles = model.poles();
    let residues = model.residues();
    let (n_out, n_in) = (model.n_outputs(), model.n_inputs());
    let order = model.model_order();
    let n = n_in * order;

    // Single-input blocks
    let mut a_blk = Array2::<f64>::zeros((order, order));
    let mut b_blk = vec![0.0; order];
    let mut pair_start = vec![false; order];
    let mut k = 0;
    while k < order {
        let p = poles[k];
        if p.im == 0.0 {
            a_blk[[k, k]] = p.re;
            b_blk[k] = 1.0;
            k += 1;
            continue;
        }

        let paired = k + 1 < order && is_conjugate(p, poles[k + 1]);
        if !paired {
            return Err(VectorFitError::UnpairedPole(p));
        }
        a_blk[[k, k]] = p.re;
        a_blk[[k, k + 1]] = p.im;
        a_blk[[k + 1, k]] = -p.im;
        a_blk[[k + 1, k + 1]] = p.re;
        b_blk[k] = 2.0;
        pair_start[k] = true;
        k += 2;
    }

    let mut a = Array2::<f64>::zeros((n, n));
    let mut b = Array2::<f64>::zeros((n, n_in));
    let mut c = Array2::<f64>::zeros((n_out, n));
    for j in 0..n_in {
        let offset = j * order;
        for r in 0..order {
            for q in 0..order {
                a[[offset + r, offset + q]] = a_blk[[r, q]];
            }
            b[[offset + r, j]] = b_blk[r];
        }

        for i in 0..n_out {
            let mut k = 0;
            while k < order {
                let r = residues[[k, i, j]];
                c[[i, offset + k]] = r.re;
                if pair_start[k] {
                    c[[i, offset + k + 1]] = r.im;
                    k += 2;
                } else {
                    k += 1;
                }
            }
        }
    }

    let d = model
        .constant()
        .cloned()
        .unwrap_or_else(|| Array2::zeros((n_out, n_in)));
    let e = model
        .proportional()
        .cloned()
        .unwrap_or_else(|| Array2::zeros((n_out, n_in)));

    Ok(StateSpace { a, b, c, d, e })
}

/// Sylvester realization
///
/// Starting from the Gilbert realization `(A, B, C)`, solves
/// `A X - X A_piv = -B F^T` and returns `(X^-1 A X, X^-1 B, C X, D, E)`.
pub fn sylvester_realization(
    model: &RationalModel,
    options: SylvesterOptions,
) -> Result<SylvesterRealization> {
    let gilbert = gilbert_realization(model)?;
    let n = gilbert.order();
    let n_in = model.n_inputs();

    let max_pole = model.poles().iter().map(|p| p.norm()).fold(0.0, f64::max);
    let pivot = match options.pivot {
        Some(p) => p,
        None => default_pivot(n, max_pole),
    };
    if pivot.dim() != (n, n) {
        return Err(VectorFitError::ShapeMismatch(format!(
            "pivot is {:?}, expected ({}, {})",
            pivot.dim(),
            n,
            n
        )));
    }

    let feedback = match options.feedback {
        Some(f) => f,
        None => random_feedback(n, n_in, options.seed),
    };
    if feedback.dim() != (n, n_in) {
        return Err(VectorFitError::ShapeMismatch(format!(
            "feedback is {:?}, expected ({}, {})",
            feedback.dim(),
            n,
            n_in
        )));
    }

    let rhs = -gilbert.b.dot(&feedback.t());
    let x = linalg::solve_sylvester(&gilbert.a, &-&pivot, &rhs)?;
    let x_inv =
        linalg::inv_real(&x).ok_or(VectorFitError::Linalg("singular similarity transform"))?;

    let state_space = StateSpace {
        a: x_inv.dot(&gilbert.a).dot(&x),
        b: x_inv.dot(&gilbert.b),
        c: gilbert.c.dot(&x),
        d: gilbert.d,
        e: gilbert.e,
    };

    Ok(SylvesterRealization {
        state_space,
        pivot,
        feedback,
    })
}

fn is_conjugate(p: Complex64, q: Complex64) -> bool {
    (q - p.conj()).norm() <= 1e-12 * p.norm().max(1.0)
}

/// Lightly damped pivot poles spread up to the largest model pole
///
/// `n / 2` pairs `-(alpha + j) * w_k` with `w_k` from `linspace(1/n, 1, n/2)`
/// scaled by `max_pole`; an odd state count gets one extra real pole.
fn default_pivot(n: usize, max_pole: f64) -> Array2<f64> {
    let mut pivot = Array2::<f64>::zeros((n, n));
    if n == 0 {
        return pivot;
    }
    let scale = if max_pole > 0.0 { max_pole } else { 1.0 };

    let n_pairs = n / 2;
    for (i, w) in linspace(1.0 / n as f64, 1.0, n_pairs).into_iter().enumerate() {
        let p = -Complex64::new(PIVOT_DAMPING, 1.0) * w * scale;
        let k = 2 * i;
        pivot[[k, k]] = p.re;
        pivot[[k + 1, k + 1]] = p.re;
        pivot[[k, k + 1]] = p.im;
        pivot[[k + 1, k]] = -p.im;
    }
    for k in 2 * n_pairs..n {
        pivot[[k, k]] = -PIVOT_DAMPING * scale / n as f64;
    }

    pivot
}

/// Random `n x n_in` matrix with orthonormal columns
fn random_feedback(n: usize, n_in: usize, seed: Option<u64>) -> Array2<f64> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let raw = Array2::from_shape_simple_fn((n, n_in), || rng.gen_range(-1.0..1.0));
    let q = linalg::orthonormalize(&raw);
    if q.ncols() == n_in {
        q
    } else {
        // Fewer states than inputs: keep the raw matrix
        raw.select(Axis(1), &(0..n_in).collect::<Vec<_>>())
    }
}
