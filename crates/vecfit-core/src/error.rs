//! Error types for vector fitting

use num_complex::Complex64;
use thiserror::Error;

/// Errors raised by the fitting engine, the rational model and the realizers
///
/// An exhausted fit is not an error; it reports `FitState::Exhausted`.
#[derive(Error, Debug)]
pub enum VectorFitError {
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Invalid frequency grid: {0}")]
    InvalidFrequencies(String),

    #[error("Invalid fit configuration: {0}")]
    InvalidConfig(String),

    #[error("Passivity check requires a square response, got {outputs}x{inputs}")]
    NonSquare { outputs: usize, inputs: usize },

    #[error("A pole at the origin cannot be represented by the {0} realization")]
    PoleAtOrigin(&'static str),

    #[error("Complex pole {0} is not followed by its conjugate")]
    UnpairedPole(Complex64),

    #[error("Linear algebra failure: {0}")]
    Linalg(&'static str),
}

pub type Result<T> = std::result::Result<T, VectorFitError>;

impl From<&'static str> for VectorFitError {
    fn from(msg: &'static str) -> Self {
        VectorFitError::Linalg(msg)
    }
}
