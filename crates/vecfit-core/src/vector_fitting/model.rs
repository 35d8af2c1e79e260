//! Rational model in pole-residue form
//!
//! H(s) = Const + s * Diff + Zero / s + sum_k[ R_k / (s - p_k) ]
//!
//! The poles are stored fully expanded: every complex pole is immediately
//! followed by its conjugate, which carries the conjugate residue.

use ndarray::{Array1, Array2, Array3, Axis};
use num_complex::Complex64;
use std::f64::consts::PI;

use crate::error::{Result, VectorFitError};
use crate::math::linalg;

/// Pole-residue model of a multi-port frequency response
#[derive(Debug, Clone)]
pub struct RationalModel {
    poles: Array1<Complex64>,
    /// Residue matrices [n_poles, n_outputs, n_inputs]
    residues: Array3<Complex64>,
    constant: Option<Array2<f64>>,
    proportional: Option<Array2<f64>>,
    pole_at_origin: Option<Array2<f64>>,
}

/// Outcome of a grid-sampled passivity check
#[derive(Debug, Clone)]
pub struct PassivityCheck {
    /// Stable and every Hermitian-part eigenvalue strictly positive
    pub passive: bool,
    /// All poles strictly in the left half plane
    pub stable: bool,
    /// Eigenvalues of H + H^H per frequency, ascending [nfreq, n_ports]
    pub eigenvalues: Array2<f64>,
}

impl PassivityCheck {
    /// Smallest Hermitian-part eigenvalue over the whole grid
    pub fn min_eigenvalue(&self) -> f64 {
        self.eigenvalues.iter().copied().fold(f64::INFINITY, f64::min)
    }
}

impl RationalModel {
    /// Create a model from its parts, validating the shapes
    ///
    /// # Arguments
    /// * `poles` - Poles, conjugate pairs adjacent
    /// * `residues` - Residue matrices [n_poles, n_outputs, n_inputs]
    /// * `constant` - Optional constant term (n_outputs x n_inputs)
    /// * `proportional` - Optional term proportional to s
    /// * `pole_at_origin` - Optional term proportional to 1/s
    pub fn new(
        poles: Array1<Complex64>,
        residues: Array3<Complex64>,
        constant: Option<Array2<f64>>,
        proportional: Option<Array2<f64>>,
        pole_at_origin: Option<Array2<f64>>,
    ) -> Result<Self> {
        let (n_res, n_out, n_in) = residues.dim();
        if n_res != poles.len() {
            return Err(VectorFitError::ShapeMismatch(format!(
                "{} poles but {} residue matrices",
                poles.len(),
                n_res
            )));
        }
        for (name, term) in [
            ("constant", &constant),
            ("proportional", &proportional),
            ("pole-at-origin", &pole_at_origin),
        ] {
            if let Some(m) = term {
                if m.dim() != (n_out, n_in) {
                    return Err(VectorFitError::ShapeMismatch(format!(
                        "{} term is {:?}, expected ({}, {})",
                        name,
                        m.dim(),
                        n_out,
                        n_in
                    )));
                }
            }
        }

        Ok(Self::from_parts(
            poles,
            residues,
            constant,
            proportional,
            pole_at_origin,
        ))
    }

    /// Internal constructor for parts that are consistent by construction
    pub(crate) fn from_parts(
        poles: Array1<Complex64>,
        residues: Array3<Complex64>,
        constant: Option<Array2<f64>>,
        proportional: Option<Array2<f64>>,
        pole_at_origin: Option<Array2<f64>>,
    ) -> Self {
        Self {
            poles,
            residues,
            constant,
            proportional,
            pole_at_origin,
        }
    }

    pub fn poles(&self) -> &Array1<Complex64> {
        &self.poles
    }

    pub fn residues(&self) -> &Array3<Complex64> {
        &self.residues
    }

    pub fn constant(&self) -> Option<&Array2<f64>> {
        self.constant.as_ref()
    }

    pub fn proportional(&self) -> Option<&Array2<f64>> {
        self.proportional.as_ref()
    }

    pub fn pole_at_origin(&self) -> Option<&Array2<f64>> {
        self.pole_at_origin.as_ref()
    }

    /// Mutable residue access, e.g. for perturbation studies
    pub fn residues_mut(&mut self) -> &mut Array3<Complex64> {
        &mut self.residues
    }

    pub fn n_outputs(&self) -> usize {
        self.residues.dim().1
    }

    pub fn n_inputs(&self) -> usize {
        self.residues.dim().2
    }

    /// Model order (number of expanded poles)
    pub fn model_order(&self) -> usize {
        self.poles.len()
    }

    /// Evaluate the model at the given frequencies (Hz)
    ///
    /// # Returns
    /// Response matrices [nfreq, n_outputs, n_inputs]
    pub fn evaluate(&self, freqs: &[f64]) -> Array3<Complex64> {
        let (n_out, n_in) = (self.n_outputs(), self.n_inputs());
        let mut response = Array3::<Complex64>::zeros((freqs.len(), n_out, n_in));

        for (f_idx, &freq) in freqs.iter().enumerate() {
            let s = Complex64::new(0.0, 2.0 * PI * freq);
            let mut h = response.index_axis_mut(Axis(0), f_idx);

            if let Some(d) = &self.constant {
                h.zip_mut_with(d, |h, &d| *h += d);
            }
            if let Some(e) = &self.proportional {
                h.zip_mut_with(e, |h, &e| *h += s * e);
            }
            if let Some(z) = &self.pole_at_origin {
                h.zip_mut_with(z, |h, &z| *h += z / s);
            }

            for (k, &pole) in self.poles.iter().enumerate() {
                let coeff = Complex64::new(1.0, 0.0) / (s - pole);
                h.scaled_add(coeff, &self.residues.index_axis(Axis(0), k));
            }
        }

        response
    }

    /// Check passivity on a frequency grid (Hz)
    ///
    /// Fails closed: the model is only reported passive if every pole has a
    /// strictly negative real part and the Hermitian part `H + H^H` is
    /// positive definite at every sample. This is a necessary, grid-sampled
    /// check; the grid must be fine enough to catch local violations.
    pub fn is_passive(&self, freqs: &[f64]) -> Result<PassivityCheck> {
        let (n_out, n_in) = (self.n_outputs(), self.n_inputs());
        if n_out != n_in {
            return Err(VectorFitError::NonSquare {
                outputs: n_out,
                inputs: n_in,
            });
        }

        let stable = self.poles.iter().all(|p| p.re < 0.0);

        let h = self.evaluate(freqs);
        let mut eigenvalues = Array2::<f64>::zeros((freqs.len(), n_out));
        for (f_idx, h_f) in h.outer_iter().enumerate() {
            let hermitian = &h_f + &h_f.t().mapv(|x| x.conj());
            let mut eigs = linalg::hermitian_eigenvalues(&hermitian)?;
            eigs.sort_by(f64::total_cmp);
            for (i, ev) in eigs.into_iter().enumerate() {
                eigenvalues[[f_idx, i]] = ev;
            }
        }

        let passive = stable && eigenvalues.iter().all(|&ev| ev > 0.0);

        Ok(PassivityCheck {
            passive,
            stable,
            eigenvalues,
        })
    }
}

/// Maximum and mean relative error `|data - fit| / |data|` over all samples
///
/// Samples where the data vanishes contribute their absolute error instead.
pub fn relative_error(data: &Array3<Complex64>, fit: &Array3<Complex64>) -> (f64, f64) {
    if data.dim() != fit.dim() || data.is_empty() {
        return (f64::NAN, f64::NAN);
    }

    let mut err_max = 0.0_f64;
    let mut err_sum = 0.0;
    for (d, f) in data.iter().zip(fit.iter()) {
        let magnitude = d.norm();
        let abs_err = (d - f).norm();
        let err = if magnitude > 0.0 {
            abs_err / magnitude
        } else {
            abs_err
        };
        err_max = err_max.max(err);
        err_sum += err;
    }

    (err_max, err_sum / data.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn single_port(poles: Vec<Complex64>, residues: Vec<Complex64>, d: f64) -> RationalModel {
        let n = poles.len();
        RationalModel::new(
            Array1::from_vec(poles),
            Array3::from_shape_vec((n, 1, 1), residues).unwrap(),
            Some(Array2::from_elem((1, 1), d)),
            None,
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_evaluate_constant_only() {
        let model = single_port(vec![], vec![], 0.5);
        let response = model.evaluate(&[1e9, 2e9, 3e9]);

        for h in response.iter() {
            assert_relative_eq!(h.re, 0.5, epsilon = 1e-12);
            assert_relative_eq!(h.im, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_evaluate_single_real_pole() {
        // H(s) = 2pi / (s + 2pi) equals 1 / (1 + j) at f = 1 Hz
        let model = single_port(
            vec![Complex64::new(-2.0 * PI, 0.0)],
            vec![Complex64::new(2.0 * PI, 0.0)],
            0.0,
        );
        let response = model.evaluate(&[1.0]);

        assert_relative_eq!(response[[0, 0, 0]].re, 0.5, epsilon = 1e-12);
        assert_relative_eq!(response[[0, 0, 0]].im, -0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_evaluate_pole_at_origin_and_proportional() {
        let model = RationalModel::new(
            Array1::zeros(0),
            Array3::zeros((0, 1, 1)),
            None,
            Some(Array2::from_elem((1, 1), 1.0 / (2.0 * PI))),
            Some(Array2::from_elem((1, 1), 2.0 * PI)),
        )
        .unwrap();

        // s/(2pi) + 2pi/s at f = 1 Hz: j - j = 0
        let h = model.evaluate(&[1.0])[[0, 0, 0]];
        assert_relative_eq!(h.norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_new_rejects_mismatched_residues() {
        let result = RationalModel::new(
            Array1::from_vec(vec![Complex64::new(-1.0, 0.0)]),
            Array3::zeros((2, 1, 1)),
            None,
            None,
            None,
        );
        assert!(matches!(result, Err(VectorFitError::ShapeMismatch(_))));
    }

    #[test]
    fn test_passivity_requires_square() {
        let model = RationalModel::new(
            Array1::zeros(0),
            Array3::zeros((0, 1, 2)),
            Some(Array2::ones((1, 2))),
            None,
            None,
        )
        .unwrap();
        assert!(matches!(
            model.is_passive(&[1.0]),
            Err(VectorFitError::NonSquare { .. })
        ));
    }

    #[test]
    fn test_unstable_model_is_not_passive() {
        let model = single_port(
            vec![Complex64::new(1.0, 0.0)],
            vec![Complex64::new(0.1, 0.0)],
            1.0,
        );
        let check = model.is_passive(&[1.0, 10.0]).unwrap();
        assert!(!check.stable);
        assert!(!check.passive);
        assert_eq!(check.eigenvalues.dim(), (2, 1));
    }

    #[test]
    fn test_relative_error() {
        let data = Array3::from_elem((2, 1, 1), Complex64::new(2.0, 0.0));
        let mut fit = data.clone();
        fit[[1, 0, 0]] = Complex64::new(2.2, 0.0);

        let (err_max, err_mean) = relative_error(&data, &fit);
        assert_relative_eq!(err_max, 0.1, epsilon = 1e-12);
        assert_relative_eq!(err_mean, 0.05, epsilon = 1e-12);
    }
}
