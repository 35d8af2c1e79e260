//! vecfit-core: rational macromodeling of sampled frequency responses
//!
//! Fits pole-residue models to complex multi-port frequency data with the
//! Vector Fitting algorithm and converts them to state-space form.
//!
//! ## Modules
//!
//! - `response` - Sampled frequency response container
//! - `vector_fitting` - Fitting engine, rational model and realizations
//! - `math` - Dense linear algebra backend
//! - `error` - Error type shared by all modules
//!
//! ## Example
//!
//! ```no_run
//! use vecfit_core::{FitConfig, SampledResponse, VectorFitting};
//! # fn demo(freqs: Vec<f64>, data: ndarray::Array3<num_complex::Complex64>) -> vecfit_core::Result<()> {
//! let response = SampledResponse::new(freqs, data)?;
//! let mut vf = VectorFitting::new(response, FitConfig::default().with_poles(0, 4))?;
//! let model = vf.fit()?;
//! println!("order {} after {} steps", model.model_order(), vf.report().steps);
//! # Ok(())
//! # }
//! ```

pub mod constants;
pub mod error;
pub mod math;
pub mod response;
pub mod vector_fitting;

pub use error::{Result, VectorFitError};
pub use response::SampledResponse;
pub use vector_fitting::{
    FitConfig, FitReport, FitState, InitPoleSpacing, InitStrategy, RationalModel, SolverKind,
    StateSpace, VectorFitting,
};
