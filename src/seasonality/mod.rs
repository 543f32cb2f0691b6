//! Seasonal decomposition.
//!
//! - [`Stl`]: Seasonal-Trend decomposition using LOESS
//! - [`deseasonalize`]: per-batch seasonal removal by STL, phase mean or phase median

mod deseasonalize;
mod stl;

pub use deseasonalize::{deseasonalize, DeseasonalityMode, Deseasonalized};
pub use stl::{Stl, StlComponents};
