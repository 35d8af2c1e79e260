//! Mathematical functions module
//!
//! Dense linear algebra used by the fitting engine and the realizers.

pub mod linalg;
