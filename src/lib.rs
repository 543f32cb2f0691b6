//! # anofox-signals
//!
//! Signal extraction for weekly business time series.
//!
//! Provides spike detection (kernel p-values over IID or SSA residuals),
//! changepoint detection (betting martingales), spectral-residual anomaly
//! detection with expected values and margins, and SSA or regression
//! forecasting. Engine outputs are per-index prediction vectors that the
//! [`align`] module maps back to dated records.

// Allow some clippy warnings for cleaner code in specific cases
#![allow(clippy::upper_case_acronyms)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_range_loop)]

pub mod align;
pub mod core;
pub mod detection;
pub mod error;
pub mod forecast;
pub mod scoring;
pub mod seasonality;
pub mod ssa;
pub mod utils;

pub use error::{Result, SignalError};

pub mod prelude {
    pub use crate::align::{
        align_anomalies, align_changepoints, align_regression, align_spikes, align_ssa_fitted,
        align_ssa_forecast, AlignmentPolicy,
    };
    pub use crate::core::{
        AlertRecord, DatedValue, Forecast, ForecastRecord, OrderedSeries, PredictionVector,
    };
    pub use crate::detection::{
        detect_anomalies, detect_change_points, detect_spikes, AnomalyConfig, AnomalyMode,
        ChangePointConfig, DetectionMethod, PeriodSetting, SpectralAnomalyEngine, SpikeConfig,
    };
    pub use crate::error::{Result, SignalError};
    pub use crate::forecast::{
        forecast_regression, forecast_ssa, train_regression, train_ssa, Learner,
    };
    pub use crate::scoring::{AnomalySide, MartingaleType};
    pub use crate::seasonality::DeseasonalityMode;
    pub use crate::ssa::{ErrorFunction, SeasonalDecomposer, SsaConfig};
}
