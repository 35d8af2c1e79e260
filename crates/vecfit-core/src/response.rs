//! Sampled frequency response container
//!
//! Holds the frequency sweep and the complex response matrices that the
//! fitting engine consumes. The data is validated once on construction and
//! treated as immutable afterwards.

use ndarray::{Array2, Array3};
use num_complex::Complex64;

use crate::error::{Result, VectorFitError};

/// Sampled multi-port frequency response
#[derive(Debug, Clone)]
pub struct SampledResponse {
    /// Frequencies in Hz, strictly increasing and positive
    freqs: Vec<f64>,
    /// Response data [nfreq, n_outputs, n_inputs]
    data: Array3<Complex64>,
}

impl SampledResponse {
    /// Create a response from a frequency vector and a data tensor
    ///
    /// # Arguments
    /// * `freqs` - Frequencies in Hz (strictly increasing, positive)
    /// * `data` - Response matrices, shape `[nfreq, n_outputs, n_inputs]`
    pub fn new(freqs: Vec<f64>, data: Array3<Complex64>) -> Result<Self> {
        let (nfreq, n_out, n_in) = data.dim();

        if freqs.len() != nfreq {
            return Err(VectorFitError::ShapeMismatch(format!(
                "{} frequencies but {} response samples",
                freqs.len(),
                nfreq
            )));
        }
        if nfreq < 2 {
            return Err(VectorFitError::InvalidFrequencies(
                "at least 2 frequency points are required".to_string(),
            ));
        }
        if n_out == 0 || n_in == 0 {
            return Err(VectorFitError::ShapeMismatch(format!(
                "empty response matrices ({}x{})",
                n_out, n_in
            )));
        }
        if let Some(f) = freqs.iter().find(|f| !(f.is_finite() && **f > 0.0)) {
            return Err(VectorFitError::InvalidFrequencies(format!(
                "frequency {} is not finite and positive",
                f
            )));
        }
        if freqs.windows(2).any(|w| w[1] <= w[0]) {
            return Err(VectorFitError::InvalidFrequencies(
                "frequencies must be strictly increasing".to_string(),
            ));
        }

        Ok(Self { freqs, data })
    }

    /// Create a single-input single-output response
    ///
    /// The samples are promoted to a `[nfreq, 1, 1]` tensor.
    pub fn from_scalar(freqs: Vec<f64>, samples: Vec<Complex64>) -> Result<Self> {
        let nfreq = samples.len();
        let data = Array3::from_shape_vec((nfreq, 1, 1), samples)
            .map_err(|e| VectorFitError::ShapeMismatch(e.to_string()))?;
        Self::new(freqs, data)
    }

    /// Frequencies in Hz
    pub fn freqs(&self) -> &[f64] {
        &self.freqs
    }

    /// Response tensor [nfreq, n_outputs, n_inputs]
    pub fn data(&self) -> &Array3<Complex64> {
        &self.data
    }

    /// Number of frequency points
    pub fn nfreq(&self) -> usize {
        self.freqs.len()
    }

    /// Number of outputs (rows of each response matrix)
    pub fn n_outputs(&self) -> usize {
        self.data.dim().1
    }

    /// Number of inputs (columns of each response matrix)
    pub fn n_inputs(&self) -> usize {
        self.data.dim().2
    }

    /// Number of input/output channels (n_outputs * n_inputs)
    pub fn n_channels(&self) -> usize {
        self.n_outputs() * self.n_inputs()
    }

    /// Highest sampled frequency in Hz
    pub fn max_freq(&self) -> f64 {
        self.freqs[self.freqs.len() - 1]
    }

    /// Channel-major view of the data: [n_channels, nfreq]
    ///
    /// Stacking order (row-major): h11, h12, ..., h21, h22, ...
    pub fn channels(&self) -> Array2<Complex64> {
        let n_in = self.n_inputs();
        Array2::from_shape_fn((self.n_channels(), self.nfreq()), |(k, f)| {
            self.data[[f, k / n_in, k % n_in]]
        })
    }
}
