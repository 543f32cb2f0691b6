//! Sequential scoring: raw score → p-value → alert evidence.

mod martingale;
mod pvalue;

pub use martingale::{MartingaleScorer, MartingaleType};
pub use pvalue::{alert_threshold, AnomalySide, PValueHistory};
