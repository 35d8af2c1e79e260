//! Residue identification strategies
//!
//! Every strategy solves, for a fixed pole set, the linearized vector fitting
//! problem `F(s) = Sigma(s) * D(s)` with
//! `Sigma(s) = d + Σ c_k / (s - p_k)` in the least squares sense.
//! Real and imaginary parts are stacked as separate real equations so that
//! all unknowns are real.
//!
//! - [`DirectSolver`]: `d = 1`, one global least squares problem.
//! - [`RelaxedSolver`]: `d` is free and pinned by one relaxation row per
//!   channel (Gustavsen 2006).
//! - [`FastRelaxedSolver`]: relaxed formulation where each channel is reduced
//!   by QR before the Sigma unknowns are solved (Deschrijver et al. 2008);
//!   F residues are then identified channel by channel.

use ndarray::{concatenate, s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use num_complex::Complex64;
use rayon::prelude::*;
use tracing::debug;

use super::basis::{Basis, BasisLayout};
use crate::constants::COLUMN_SCALE_TOL;
use crate::error::{Result, VectorFitError};
use crate::math::linalg;

/// Residues solved for one pole set, in frequency-normalized units
#[derive(Debug, Clone, Default)]
pub struct ResidueSolution {
    pub constant: Option<Array2<f64>>,
    pub proportional: Option<Array2<f64>>,
    pub pole_at_origin: Option<Array2<f64>>,
    /// One residue matrix per real pole
    pub residues_real: Vec<Array2<Complex64>>,
    /// One residue matrix per complex pair (residue of the positive pole)
    pub residues_complex: Vec<Array2<Complex64>>,
    pub sigma_real: Vec<f64>,
    pub sigma_complex: Vec<Complex64>,
    /// Relaxation constant `d`, None when it is fixed to one
    pub d_relax: Option<f64>,
}

/// A residue identification strategy
///
/// `data` holds one row per channel ([n_channels, nfreq], row-major channel
/// order) and `shape` is the `(n_outputs, n_inputs)` of the response.
pub trait ResidueSolver: Send + Sync + std::fmt::Debug {
    fn solve(
        &self,
        basis: &Basis,
        data: &Array2<Complex64>,
        shape: (usize, usize),
    ) -> Result<ResidueSolution>;

    /// Short name used in log output
    fn name(&self) -> &'static str;
}

/// Non-relaxed vector fitting
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectSolver;

/// Relaxed vector fitting
#[derive(Debug, Clone, Copy, Default)]
pub struct RelaxedSolver;

/// Relaxed vector fitting with per-channel QR compression
#[derive(Debug, Clone, Copy, Default)]
pub struct FastRelaxedSolver;

impl ResidueSolver for DirectSolver {
    fn solve(
        &self,
        basis: &Basis,
        data: &Array2<Complex64>,
        shape: (usize, usize),
    ) -> Result<ResidueSolution> {
        let layout = basis.layout();
        let (n_f, n_s) = (layout.n_f(), layout.n_sigma());
        let n_ch = data.nrows();
        let nfreq = basis.nfreq();
        let x_f = basis.x_f();
        let x_s = basis.x_s();

        // Block k: [0 .. X_F .. 0 | -D_k X_S] x = D_k
        let n_cols = n_ch * n_f + n_s;
        let mut a = Array2::<f64>::zeros((2 * nfreq * n_ch, n_cols));
        let mut b = Array1::<f64>::zeros(2 * nfreq * n_ch);

        for (k, d) in data.outer_iter().enumerate() {
            let row0 = 2 * nfreq * k;
            for i in 0..nfreq {
                let (re, im) = (row0 + i, row0 + nfreq + i);
                for c in 0..n_f {
                    a[[re, k * n_f + c]] = x_f[[i, c]].re;
                    a[[im, k * n_f + c]] = x_f[[i, c]].im;
                }
                for c in 0..n_s {
                    let v = -d[i] * x_s[[i, c]];
                    a[[re, n_ch * n_f + c]] = v.re;
                    a[[im, n_ch * n_f + c]] = v.im;
                }
                b[re] = d[i].re;
                b[im] = d[i].im;
            }
        }

        let x = solve_scaled(a, b)?;
        let f_coeffs: Vec<ArrayView1<f64>> = (0..n_ch)
            .map(|k| x.slice(s![k * n_f..(k + 1) * n_f]))
            .collect();

        Ok(assemble(
            layout,
            shape,
            &f_coeffs,
            x.slice(s![n_ch * n_f..]),
            None,
        ))
    }

    fn name(&self) -> &'static str {
        "direct"
    }
}

impl ResidueSolver for RelaxedSolver {
    fn solve(
        &self,
        basis: &Basis,
        data: &Array2<Complex64>,
        shape: (usize, usize),
    ) -> Result<ResidueSolution> {
        let layout = basis.layout();
        let (n_f, n_s) = (layout.n_f(), layout.n_sigma());
        let n_ch = data.nrows();
        let nfreq = basis.nfreq();
        let x_f = basis.x_f();
        let x_s = basis.x_s();
        let sigma_sum = relaxation_row(&x_s);

        // Block k: [0 .. X_F .. 0 | -D_k X_S | -D_k] x = 0
        //          w_k [0 .. 0 | Σ Re X_S | N]   x = w_k N
        let block_rows = 2 * nfreq + 1;
        let n_cols = n_ch * n_f + n_s + 1;
        let col_s = n_ch * n_f;
        let col_d = n_cols - 1;
        let mut a = Array2::<f64>::zeros((block_rows * n_ch, n_cols));
        let mut b = Array1::<f64>::zeros(block_rows * n_ch);

        for (k, d) in data.outer_iter().enumerate() {
            let row0 = block_rows * k;
            for i in 0..nfreq {
                let (re, im) = (row0 + i, row0 + nfreq + i);
                for c in 0..n_f {
                    a[[re, k * n_f + c]] = x_f[[i, c]].re;
                    a[[im, k * n_f + c]] = x_f[[i, c]].im;
                }
                for c in 0..n_s {
                    let v = -d[i] * x_s[[i, c]];
                    a[[re, col_s + c]] = v.re;
                    a[[im, col_s + c]] = v.im;
                }
                a[[re, col_d]] = -d[i].re;
                a[[im, col_d]] = -d[i].im;
            }

            let w = relaxation_weight(d);
            let relax = row0 + 2 * nfreq;
            for c in 0..n_s {
                a[[relax, col_s + c]] = w * sigma_sum[c];
            }
            a[[relax, col_d]] = w * nfreq as f64;
            b[relax] = w * nfreq as f64;
        }

        let x = solve_scaled(a, b)?;
        let f_coeffs: Vec<ArrayView1<f64>> = (0..n_ch)
            .map(|k| x.slice(s![k * n_f..(k + 1) * n_f]))
            .collect();

        Ok(assemble(
            layout,
            shape,
            &f_coeffs,
            x.slice(s![col_s..col_d]),
            Some(x[col_d]),
        ))
    }

    fn name(&self) -> &'static str {
        "relaxed"
    }
}

impl ResidueSolver for FastRelaxedSolver {
    fn solve(
        &self,
        basis: &Basis,
        data: &Array2<Complex64>,
        shape: (usize, usize),
    ) -> Result<ResidueSolution> {
        let layout = basis.layout();
        let (n_f, n_s) = (layout.n_f(), layout.n_sigma());
        let nfreq = basis.nfreq();
        let x_f = basis.x_f();
        let x_s = basis.x_s();
        let sigma_sum = relaxation_row(&x_s);

        // Phase 1: compress every channel to the rows that only involve the
        // Sigma unknowns and d
        let blocks: Vec<(Array2<f64>, Array1<f64>)> = (0..data.nrows())
            .into_par_iter()
            .map(|k| {
                let d = data.row(k);
                let mut a = Array2::<f64>::zeros((2 * nfreq + 1, n_f + n_s + 1));
                let mut b = Array1::<f64>::zeros(2 * nfreq + 1);
                for i in 0..nfreq {
                    for c in 0..n_f {
                        a[[i, c]] = x_f[[i, c]].re;
                        a[[nfreq + i, c]] = x_f[[i, c]].im;
                    }
                    for c in 0..n_s {
                        let v = -d[i] * x_s[[i, c]];
                        a[[i, n_f + c]] = v.re;
                        a[[nfreq + i, n_f + c]] = v.im;
                    }
                    a[[i, n_f + n_s]] = -d[i].re;
                    a[[nfreq + i, n_f + n_s]] = -d[i].im;
                }

                let w = relaxation_weight(d);
                let relax = 2 * nfreq;
                for c in 0..n_s {
                    a[[relax, n_f + c]] = w * sigma_sum[c];
                }
                a[[relax, n_f + n_s]] = w * nfreq as f64;
                b[relax] = w * nfreq as f64;

                let (q, r) = linalg::qr(&a);
                let start = n_f.min(r.nrows());
                let r22 = r.slice(s![start.., n_f..]).to_owned();
                let y = q.slice(s![.., start..]).t().dot(&b);
                (r22, y)
            })
            .collect();

        let r_views: Vec<ArrayView2<f64>> = blocks.iter().map(|(r, _)| r.view()).collect();
        let y_views: Vec<ArrayView1<f64>> = blocks.iter().map(|(_, y)| y.view()).collect();
        let rr = concatenate(Axis(0), &r_views)
            .map_err(|_| VectorFitError::Linalg("cannot stack reduced blocks"))?;
        let yy = concatenate(Axis(0), &y_views)
            .map_err(|_| VectorFitError::Linalg("cannot stack reduced blocks"))?;

        let (sigma, d_relax) = if rr.nrows() == 0 {
            (Array1::zeros(n_s), 1.0)
        } else {
            let x = solve_scaled(rr, yy)?;
            (x.slice(s![..n_s]).to_owned(), x[n_s])
        };

        // Phase 2: F residues channel by channel from X_F alone
        let mut xx = Array2::<f64>::zeros((2 * nfreq, n_f));
        for i in 0..nfreq {
            for c in 0..n_f {
                xx[[i, c]] = x_f[[i, c]].re;
                xx[[nfreq + i, c]] = x_f[[i, c]].im;
            }
        }

        let f_coeffs: Vec<Array1<f64>> = (0..data.nrows())
            .into_par_iter()
            .map(|k| {
                let d = data.row(k);
                let mut rhs = Array1::<f64>::zeros(2 * nfreq);
                for i in 0..nfreq {
                    rhs[i] = d[i].re;
                    rhs[nfreq + i] = d[i].im;
                }
                solve_scaled(xx.clone(), rhs)
            })
            .collect::<Result<_>>()?;
        let f_views: Vec<ArrayView1<f64>> = f_coeffs.iter().map(|f| f.view()).collect();

        Ok(assemble(
            layout,
            shape,
            &f_views,
            sigma.view(),
            Some(d_relax),
        ))
    }

    fn name(&self) -> &'static str {
        "fast-relaxed"
    }
}

/// `Σ_i Re X_S(w_i)` per Sigma column
fn relaxation_row(x_s: &ArrayView2<Complex64>) -> Array1<f64> {
    x_s.map(|v| v.re).sum_axis(Axis(0))
}

/// Weight of the relaxation row of one channel, `||D_k||_2 / N`
fn relaxation_weight(d: ArrayView1<Complex64>) -> f64 {
    let norm = d.iter().map(|v| v.norm_sqr()).sum::<f64>().sqrt();
    norm / d.len() as f64
}

/// Least squares with column and right-hand-side normalization
///
/// Columns are scaled to unit max magnitude and the right-hand side to unit
/// max magnitude; both scalings are undone on the solution.
fn solve_scaled(mut a: Array2<f64>, mut b: Array1<f64>) -> Result<Array1<f64>> {
    if a.ncols() == 0 {
        return Ok(Array1::zeros(0));
    }

    let col_scale: Array1<f64> = a
        .columns()
        .into_iter()
        .map(|col| {
            let m = col.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
            if m > COLUMN_SCALE_TOL {
                m
            } else {
                1.0
            }
        })
        .collect();
    for (mut col, &scale) in a.columns_mut().into_iter().zip(col_scale.iter()) {
        col /= scale;
    }

    let b_max = b.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let b_scale = if b_max > 0.0 { b_max } else { 1.0 };
    b /= b_scale;

    let result = linalg::lstsq(&a, &b)?;
    if result.rank < a.ncols() {
        debug!(
            rank = result.rank,
            unknowns = a.ncols(),
            "rank deficient least squares, using minimum-norm solution"
        );
    }
    Ok(result.solution * b_scale / &col_scale)
}

/// Split solved coefficient vectors into polynomial terms and residues
fn assemble(
    layout: BasisLayout,
    shape: (usize, usize),
    f_coeffs: &[ArrayView1<f64>],
    sigma: ArrayView1<f64>,
    d_relax: Option<f64>,
) -> ResidueSolution {
    let (n_out, n_in) = shape;
    let n_poly = layout.n_poly();
    let (n_real, n_cpx) = (layout.n_real, layout.n_complex);

    let real_term = |col: usize| {
        Array2::from_shape_fn((n_out, n_in), |(i, j)| f_coeffs[i * n_in + j][col])
    };
    let complex_term = |col_re: usize, col_im: usize| {
        Array2::from_shape_fn((n_out, n_in), |(i, j)| {
            let f = &f_coeffs[i * n_in + j];
            Complex64::new(f[col_re], f[col_im])
        })
    };

    let mut col = 0;
    let mut next_poly = |enabled: bool| {
        if enabled {
            col += 1;
            Some(real_term(col - 1))
        } else {
            None
        }
    };
    let constant = next_poly(layout.terms.constant);
    let proportional = next_poly(layout.terms.proportional);
    let pole_at_origin = next_poly(layout.terms.pole_at_origin);

    let residues_real = (0..n_real)
        .map(|i| real_term(n_poly + i).mapv(|v| Complex64::new(v, 0.0)))
        .collect();
    let cpx0 = n_poly + n_real;
    let residues_complex = (0..n_cpx)
        .map(|i| complex_term(cpx0 + i, cpx0 + n_cpx + i))
        .collect();

    let sigma_real = sigma.slice(s![..n_real]).to_vec();
    let sigma_complex = (0..n_cpx)
        .map(|i| Complex64::new(sigma[n_real + i], sigma[n_real + n_cpx + i]))
        .collect();

    ResidueSolution {
        constant,
        proportional,
        pole_at_origin,
        residues_real,
        residues_complex,
        sigma_real,
        sigma_complex,
        d_relax,
    }
}
