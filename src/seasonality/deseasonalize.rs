//! Seasonal component removal ahead of spectral residual scoring.

use super::stl::Stl;
use crate::utils::stats::{mean, median};
use serde::{Deserialize, Serialize};

/// How the seasonal component of a batch is estimated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeseasonalityMode {
    /// Robust STL decomposition.
    #[default]
    Stl,
    /// Per-phase mean.
    Mean,
    /// Per-phase median.
    Median,
}

/// Batches shorter than this many periods fall back from STL to phase means.
const STL_MIN_CYCLES: usize = 4;

/// A batch split into seasonal part and remainder (`values = seasonal + adjusted`).
#[derive(Debug, Clone, PartialEq)]
pub struct Deseasonalized {
    pub seasonal: Vec<f64>,
    pub adjusted: Vec<f64>,
}

impl Deseasonalized {
    fn unchanged(values: &[f64]) -> Self {
        Self {
            seasonal: vec![0.0; values.len()],
            adjusted: values.to_vec(),
        }
    }

    fn from_seasonal(values: &[f64], seasonal: Vec<f64>) -> Self {
        let adjusted = values.iter().zip(&seasonal).map(|(v, s)| v - s).collect();
        Self { seasonal, adjusted }
    }
}

/// Remove the seasonal component of `values` for the given period.
///
/// Phase statistics are centred so the level of the series stays in the
/// adjusted values. Without a period, or with fewer than two full cycles,
/// the batch is returned unchanged.
pub fn deseasonalize(values: &[f64], period: Option<usize>, mode: DeseasonalityMode) -> Deseasonalized {
    let period = match period {
        Some(p) if p >= 2 && values.len() >= 2 * p => p,
        Some(p) => {
            log::debug!(
                "batch of {} points too short for period {p}; no seasonal adjustment",
                values.len()
            );
            return Deseasonalized::unchanged(values);
        }
        None => return Deseasonalized::unchanged(values),
    };

    match mode {
        DeseasonalityMode::Stl if values.len() >= STL_MIN_CYCLES * period => {
            match Stl::new(period).decompose(values) {
                Some(parts) => Deseasonalized::from_seasonal(values, parts.seasonal),
                None => phase_adjusted(values, period, mean),
            }
        }
        DeseasonalityMode::Stl => {
            log::warn!(
                "batch of {} points spans fewer than {STL_MIN_CYCLES} cycles of period {period}; using phase means instead of STL",
                values.len()
            );
            phase_adjusted(values, period, mean)
        }
        DeseasonalityMode::Mean => phase_adjusted(values, period, mean),
        DeseasonalityMode::Median => phase_adjusted(values, period, median),
    }
}

fn phase_adjusted(values: &[f64], period: usize, statistic: fn(&[f64]) -> f64) -> Deseasonalized {
    let phases: Vec<f64> = (0..period)
        .map(|phase| {
            let members: Vec<f64> = values.iter().skip(phase).step_by(period).copied().collect();
            statistic(&members)
        })
        .collect();
    let centre = statistic(&phases);
    let seasonal = (0..values.len())
        .map(|i| phases[i % period] - centre)
        .collect();
    Deseasonalized::from_seasonal(values, seasonal)
}
