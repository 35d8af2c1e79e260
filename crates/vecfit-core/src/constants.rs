//! Numerical constants shared across the crate
//!
//! Provides standardized tolerance values used by the linear algebra layer
//! and the fitting algorithms.

/// Tolerance for detecting near-zero values in division and singularity checks.
pub const NEAR_ZERO: f64 = 1e-15;

/// Sub-diagonal magnitude above which a real Schur form entry marks a 2x2
/// block (complex eigenvalue pair).
pub const SCHUR_BLOCK_TOL: f64 = 1e-10;

/// Tolerance for column scaling in numerical algorithms.
/// Columns with a smaller maximum magnitude are left unscaled.
pub const COLUMN_SCALE_TOL: f64 = 1e-15;
