//! Detection engines.
//!
//! - [`spike`]: point anomalies from kernel p-values (IID or SSA residuals)
//! - [`changepoint`]: regime shifts from betting martingales
//! - [`anomaly`]: batch spectral residual anomalies with optional margins
//! - [`periodicity`]: seasonal period detection used by the anomaly engine

pub mod anomaly;
pub mod changepoint;
pub mod fft;
pub mod periodicity;
pub mod spectral_residual;
pub mod spike;

pub use anomaly::{
    batch_ranges, detect_anomalies, AnomalyConfig, AnomalyMode, AnomalyResult,
    SpectralAnomalyEngine, MIN_SERIES_LENGTH,
};
pub use changepoint::{
    detect_change_points, detect_change_points_iid, detect_change_points_ssa, ChangePointConfig,
    ChangePointResult,
};
pub use periodicity::{
    detect_period, detect_periods, period_or_zero, DetectedPeriod, PeriodSetting,
    PeriodicityConfig,
};
pub use spectral_residual::{saliency_map, SaliencyMap};
pub use spike::{detect_spikes, detect_spikes_iid, detect_spikes_ssa, DetectionMethod, SpikeConfig};
