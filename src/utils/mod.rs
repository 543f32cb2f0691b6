//! Numeric utility functions shared by the engines.

pub mod linalg;
pub mod ols;
pub mod stats;

pub use linalg::{solve_symmetric, symmetric_eigen, SymmetricEigen};
pub use ols::{line_fit, ols_fit, OLSResult};
pub use stats::{cdf_normal, quantile_normal};
