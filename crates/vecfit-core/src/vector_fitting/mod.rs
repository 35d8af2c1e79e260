//! Vector Fitting algorithm for rational approximation of frequency responses
//!
//! Fits a pole-residue model
//! `H(s) = D + s E + Z / s + Σ R_k / (s - p_k)`
//! to sampled multi-port frequency data by iterated pole relocation.
//!
//! Pipeline per iteration: relocate poles from the zeros of the weighting
//! function, reflect unstable poles, solve residues with the configured
//! [`ResidueSolver`], rebuild the model and measure the error. The fitted
//! [`RationalModel`] can be checked for passivity or turned into a real
//! state-space realization.
//!
//! # References
//!
//! - B. Gustavsen, A. Semlyen, "Rational Approximation of Frequency Domain Responses
//!   by Vector Fitting", IEEE Trans. Power Delivery, vol. 14, no. 3, 1999
//! - B. Gustavsen, "Improving the Pole Relocating Properties of Vector Fitting",
//!   IEEE Trans. Power Delivery, vol. 21, no. 3, 2006
//! - D. Deschrijver, M. Mrozowski, T. Dhaene, D. De Zutter, "Macromodeling of
//!   Multiport Systems Using a Fast Implementation of the Vector Fitting Method",
//!   IEEE Microwave and Wireless Components Letters, vol. 18, no. 6, 2008

pub mod basis;
pub mod config;
pub mod constants;
mod core;
pub mod init;
pub mod model;
pub mod poles;
pub mod reduction;
pub mod relocation;
pub mod solver;
pub mod state_space;

pub use self::core::{FitReport, FitState, VectorFitting};
pub use config::{FitConfig, InitStrategy, SolverKind};
pub use init::InitPoleSpacing;
pub use model::{relative_error, PassivityCheck, RationalModel};
pub use poles::{HalfModel, PoleRecord, PoleSet};
pub use solver::{DirectSolver, FastRelaxedSolver, RelaxedSolver, ResidueSolution, ResidueSolver};
pub use state_space::{
    gilbert_realization, sylvester_realization, StateSpace, SylvesterOptions,
    SylvesterRealization,
};
