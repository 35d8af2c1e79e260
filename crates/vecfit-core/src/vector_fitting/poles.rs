//! Half pole/residue representation used during fitting
//!
//! Real poles are stored once and complex poles are stored as one
//! representative (positive imaginary part) per conjugate pair; the conjugate
//! is implicit. Everything here lives in frequency-normalized units.
//! [`HalfModel::expand`] is the only bridge to the externally visible
//! [`RationalModel`].

use ndarray::{Array1, Array2, Array3, Axis};
use num_complex::Complex64;

use super::model::RationalModel;
use super::solver::ResidueSolution;

/// A categorized set of poles
///
/// Complex poles are stored with positive imaginary parts only (the
/// conjugate is implicit).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoleSet {
    real_poles: Vec<f64>,
    complex_poles: Vec<Complex64>,
}

impl PoleSet {
    /// Create a PoleSet from separate real and complex pole vectors
    pub fn from_parts(real_poles: Vec<f64>, complex_poles: Vec<Complex64>) -> Self {
        Self {
            real_poles,
            complex_poles,
        }
    }

    /// Number of real poles
    #[inline]
    pub fn n_real(&self) -> usize {
        self.real_poles.len()
    }

    /// Number of complex pole pairs
    #[inline]
    pub fn n_complex(&self) -> usize {
        self.complex_poles.len()
    }

    /// Check if pole set is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.real_poles.is_empty() && self.complex_poles.is_empty()
    }

    /// Model order = n_real + 2 * n_complex
    ///
    /// This is the dimension of the real state-space representation.
    #[inline]
    pub fn model_order(&self) -> usize {
        self.real_poles.len() + 2 * self.complex_poles.len()
    }

    #[inline]
    pub fn real_poles(&self) -> &[f64] {
        &self.real_poles
    }

    #[inline]
    pub fn complex_poles(&self) -> &[Complex64] {
        &self.complex_poles
    }

    /// Reflect unstable poles into the left half plane
    ///
    /// `p -> -|Re p| + j Im p`
    pub fn stabilize(&mut self) {
        for p in self.real_poles.iter_mut() {
            *p = -p.abs();
        }
        for p in self.complex_poles.iter_mut() {
            p.re = -p.re.abs();
        }
    }
}

/// One pole of the half representation with everything solved for it
#[derive(Debug, Clone)]
pub struct PoleRecord {
    id: usize,
    /// Pole (imaginary part zero for real poles, positive for pairs)
    pub pole: Complex64,
    /// Residue matrix of the fitted response F
    pub residue: Array2<Complex64>,
    /// Residue of the weighting function Sigma
    pub sigma: Complex64,
}

impl PoleRecord {
    /// Identity of the record inside its [`HalfModel`]
    pub fn id(&self) -> usize {
        self.id
    }
}

/// Reduced (half) model state owned by the fitting engine
#[derive(Debug, Clone, Default)]
pub struct HalfModel {
    pub real: Vec<PoleRecord>,
    pub complex: Vec<PoleRecord>,
    pub constant: Option<Array2<f64>>,
    pub proportional: Option<Array2<f64>>,
    pub pole_at_origin: Option<Array2<f64>>,
    /// Relaxation constant of Sigma (None without relaxation)
    pub d_relax: Option<f64>,
}

impl HalfModel {
    /// Pair a pole set with the residues solved for it
    pub fn from_solution(poles: &PoleSet, solution: ResidueSolution) -> Self {
        let ResidueSolution {
            constant,
            proportional,
            pole_at_origin,
            residues_real,
            residues_complex,
            sigma_real,
            sigma_complex,
            d_relax,
        } = solution;

        let real: Vec<PoleRecord> = poles
            .real_poles()
            .iter()
            .zip(residues_real)
            .zip(sigma_real)
            .map(|((&p, residue), sigma)| (Complex64::new(p, 0.0), residue, Complex64::new(sigma, 0.0)))
            .enumerate()
            .map(|(id, (pole, residue, sigma))| PoleRecord {
                id,
                pole,
                residue,
                sigma,
            })
            .collect();

        let offset = real.len();
        let complex = poles
            .complex_poles()
            .iter()
            .zip(residues_complex)
            .zip(sigma_complex)
            .enumerate()
            .map(|(i, ((&pole, residue), sigma))| PoleRecord {
                id: offset + i,
                pole,
                residue,
                sigma,
            })
            .collect();

        Self {
            real,
            complex,
            constant,
            proportional,
            pole_at_origin,
            d_relax,
        }
    }

    /// Current pole set
    pub fn pole_set(&self) -> PoleSet {
        PoleSet::from_parts(
            self.real.iter().map(|r| r.pole.re).collect(),
            self.complex.iter().map(|r| r.pole).collect(),
        )
    }

    /// Number of pole records (real poles + conjugate pairs)
    pub fn n_records(&self) -> usize {
        self.real.len() + self.complex.len()
    }

    /// Remove the record with the given id, returns whether one was removed
    pub fn remove(&mut self, id: usize) -> bool {
        let before = self.n_records();
        self.real.retain(|r| r.id != id);
        self.complex.retain(|r| r.id != id);
        self.n_records() != before
    }

    /// Expand into the externally visible model in physical units
    ///
    /// Conjugate pairs are written out explicitly and the normalized
    /// quantities are rescaled by `freq_scale`: poles and residues are
    /// multiplied, the proportional term divided and the pole-at-origin term
    /// multiplied.
    pub fn expand(&self, freq_scale: f64, shape: (usize, usize)) -> RationalModel {
        let mut poles = Vec::with_capacity(self.real.len() + 2 * self.complex.len());
        let mut residues = Vec::with_capacity(poles.capacity());

        for rec in &self.real {
            poles.push(rec.pole * freq_scale);
            residues.push(rec.residue.mapv(|r| r * freq_scale));
        }
        for rec in &self.complex {
            poles.push(rec.pole * freq_scale);
            poles.push(rec.pole.conj() * freq_scale);
            residues.push(rec.residue.mapv(|r| r * freq_scale));
            residues.push(rec.residue.mapv(|r| r.conj() * freq_scale));
        }

        let mut stacked = Array3::<Complex64>::zeros((poles.len(), shape.0, shape.1));
        for (k, r) in residues.iter().enumerate() {
            stacked.index_axis_mut(Axis(0), k).assign(r);
        }

        RationalModel::from_parts(
            Array1::from_vec(poles),
            stacked,
            self.constant.clone(),
            self.proportional.as_ref().map(|e| e / freq_scale),
            self.pole_at_origin.as_ref().map(|z| z * freq_scale),
        )
    }
}
