//! Constants for Vector Fitting algorithms
//!
//! Centralizes magic numbers to improve code clarity and maintainability.

// ============================================================================
// Numerical tolerances
// ============================================================================

/// Default convergence tolerance on the maximum relative error
pub const DEFAULT_TOLERANCE: f64 = 1e-3;

/// Default iteration budget of the convergence loop
pub const DEFAULT_MAX_STEPS: usize = 5;

/// Minimum magnitude of the relaxation constant used in pole relocation
pub const RELAXATION_TOLERANCE: f64 = 1e-8;

/// Relative tolerance (times max |omega|) for treating a relocated pole as real
pub const REAL_POLE_TOLERANCE: f64 = 1e-12;

// ============================================================================
// Pole initialization parameters
// ============================================================================

/// Damping ratio for complex pole initialization
/// (real part = -DAMPING_RATIO * omega)
pub const COMPLEX_POLE_DAMPING_RATIO: f64 = 0.01;

/// Divisor applied to the real starting poles (pole = -omega / DIVISOR)
pub const REAL_POLE_DIVISOR: f64 = 50.0;

/// Lowest real starting pole as a fraction of omega_max
pub const REAL_POLE_START_FRACTION: f64 = 1.0 / 75.0;

/// Lowest complex starting pole as a fraction of omega_max
pub const COMPLEX_POLE_START_FRACTION: f64 = 1.0 / 100.0;

/// Phase change (degrees) counted as one real-pole transition in smart init
pub const PHASE_TRANSITION_DEG: f64 = 90.0;

// ============================================================================
// Sylvester realization parameters
// ============================================================================

/// Relative real part of the generated pivot poles (close to the imaginary axis)
pub const PIVOT_DAMPING: f64 = 1e-3;
