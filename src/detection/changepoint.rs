//! Regime-shift ("changepoint") detection with betting martingales.
//!
//! Raw scores and p-values are produced exactly as for spikes; the p-values
//! then drive a [`MartingaleScorer`] whose wealth crossing
//! `1 / (1 - confidence / 100)` marks a changepoint.

use super::spike::{ssa_detector_config, validate_confidence, validate_ssa_windows, DetectionMethod};
use crate::core::{OrderedSeries, PredictionVector};
use crate::error::{Result, SignalError};
use crate::scoring::{AnomalySide, MartingaleScorer, MartingaleType, PValueHistory};
use crate::ssa::{ErrorFunction, SeasonalDecomposer};
use serde::{Deserialize, Serialize};

/// Configuration for changepoint detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangePointConfig {
    pub method: DetectionMethod,
    /// Confidence percentage in (0, 100).
    pub confidence: f64,
    /// Length of the p-value history and of the martingale window.
    pub change_history_length: usize,
    pub training_window_size: usize,
    pub seasonality_window_size: usize,
    pub martingale: MartingaleType,
    /// Power-martingale exponent, in (0, 1).
    pub eps: f64,
    pub error_function: ErrorFunction,
    /// p-values are floored here before betting.
    pub p_value_floor: f64,
    pub side: AnomalySide,
}

impl Default for ChangePointConfig {
    fn default() -> Self {
        Self {
            method: DetectionMethod::Iid,
            confidence: 95.0,
            change_history_length: 20,
            training_window_size: 100,
            seasonality_window_size: 10,
            martingale: MartingaleType::Power,
            eps: 0.1,
            error_function: ErrorFunction::SignedDifference,
            p_value_floor: 1e-3,
            side: AnomalySide::TwoSided,
        }
    }
}

impl ChangePointConfig {
    pub fn iid(confidence: f64, change_history_length: usize) -> Self {
        Self {
            method: DetectionMethod::Iid,
            confidence,
            change_history_length,
            ..Default::default()
        }
    }

    pub fn ssa(
        confidence: f64,
        change_history_length: usize,
        seasonality_window_size: usize,
        training_window_size: usize,
    ) -> Self {
        Self {
            method: DetectionMethod::Ssa,
            confidence,
            change_history_length,
            seasonality_window_size,
            training_window_size,
            ..Default::default()
        }
    }

    pub fn martingale(mut self, martingale: MartingaleType) -> Self {
        self.martingale = martingale;
        self
    }

    pub fn eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }

    pub fn error_function(mut self, error_function: ErrorFunction) -> Self {
        self.error_function = error_function;
        self
    }

    pub fn p_value_floor(mut self, floor: f64) -> Self {
        self.p_value_floor = floor;
        self
    }

    pub fn side(mut self, side: AnomalySide) -> Self {
        self.side = side;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_confidence(self.confidence)?;
        if self.change_history_length == 0 {
            return Err(SignalError::config(
                "change_history_length",
                "must be at least 1",
            ));
        }
        if !(self.eps > 0.0 && self.eps < 1.0) {
            return Err(SignalError::config(
                "eps",
                format!("must be in (0, 1), got {}", self.eps),
            ));
        }
        if !(self.p_value_floor > 0.0 && self.p_value_floor < 1.0) {
            return Err(SignalError::config(
                "p_value_floor",
                format!("must be in (0, 1), got {}", self.p_value_floor),
            ));
        }
        if self.method == DetectionMethod::Ssa {
            validate_ssa_windows(self.seasonality_window_size, self.training_window_size)?;
        }
        Ok(())
    }
}

/// Output of [`detect_change_points`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChangePointResult {
    /// `[is_alert, raw_score, p_value]` per point.
    pub predictions: Vec<PredictionVector>,
    /// Martingale value after each point.
    pub martingale: Vec<f64>,
    /// Missing-value indicator column.
    pub missing: Vec<bool>,
}

impl ChangePointResult {
    /// Indices flagged as changepoints.
    pub fn alert_indices(&self) -> Vec<usize> {
        self.predictions
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_alert())
            .map(|(i, _)| i)
            .collect()
    }
}

/// Detect changepoints.
///
/// Missing observations produce `[0, 0, 1]` and leave both the p-value
/// history and the martingale untouched.
pub fn detect_change_points(
    series: &OrderedSeries,
    config: &ChangePointConfig,
) -> Result<ChangePointResult> {
    config.validate()?;
    let values = series.values();
    let missing = series.missing_mask();

    let raw_scores = match config.method {
        DetectionMethod::Iid => {
            series.require_len(1)?;
            values
        }
        DetectionMethod::Ssa => {
            series.require_len(2 * config.seasonality_window_size + 1)?;
            let decomposer = SeasonalDecomposer::new(ssa_detector_config(
                config.seasonality_window_size,
                config.training_window_size,
            ))?;
            decomposer
                .decompose(&values)?
                .scores(&values, config.error_function)
        }
    };

    let mut history = PValueHistory::new(config.change_history_length, config.side);
    let mut scorer = MartingaleScorer::new(
        config.martingale,
        config.eps,
        config.p_value_floor,
        config.change_history_length,
        config.confidence,
    );

    let mut predictions = Vec::with_capacity(raw_scores.len());
    let mut martingale = Vec::with_capacity(raw_scores.len());
    for (raw, &is_missing) in raw_scores.into_iter().zip(&missing) {
        if is_missing || !raw.is_finite() {
            predictions.push(PredictionVector::neutral_alert());
            martingale.push(scorer.live_log_value().exp());
            continue;
        }
        let p = history.score(raw);
        let (alert, wealth) = scorer.update(p);
        predictions.push(PredictionVector::alert(alert, raw, p));
        martingale.push(wealth);
    }

    log::debug!(
        "changepoint detection: {} alerts over {} points",
        predictions.iter().filter(|p| p.is_alert()).count(),
        predictions.len()
    );
    Ok(ChangePointResult {
        predictions,
        martingale,
        missing,
    })
}

/// IID changepoint detection.
pub fn detect_change_points_iid(
    series: &OrderedSeries,
    confidence: f64,
    change_history_length: usize,
    martingale: MartingaleType,
    eps: f64,
) -> Result<ChangePointResult> {
    let config = ChangePointConfig::iid(confidence, change_history_length)
        .martingale(martingale)
        .eps(eps);
    detect_change_points(series, &config)
}

/// SSA changepoint detection.
pub fn detect_change_points_ssa(
    series: &OrderedSeries,
    confidence: f64,
    change_history_length: usize,
    window: usize,
    training_window: usize,
    martingale: MartingaleType,
    eps: f64,
) -> Result<ChangePointResult> {
    let config = ChangePointConfig::ssa(confidence, change_history_length, window, training_window)
        .martingale(martingale)
        .eps(eps);
    detect_change_points(series, &config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn weekly(values: &[f64]) -> OrderedSeries {
        OrderedSeries::weekly(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(), values)
    }

    fn level_shift() -> Vec<f64> {
        (0..60)
            .map(|i| {
                let noise = ((i * 7) % 5) as f64 * 0.2;
                if i < 30 {
                    10.0 + noise
                } else {
                    50.0 + noise
                }
            })
            .collect()
    }

    #[test]
    fn iid_detects_level_shift() {
        let result =
            detect_change_points_iid(&weekly(&level_shift()), 95.0, 20, MartingaleType::Power, 0.1)
                .unwrap();
        let alerts = result.alert_indices();
        assert!(!alerts.is_empty());
        assert!((30..=33).contains(&alerts[0]), "alerts: {alerts:?}");
        assert_eq!(result.martingale.len(), 60);
        assert!(result.predictions.iter().all(|p| p.len() == 3));
    }

    #[test]
    fn mixture_martingale_also_detects_shift() {
        let result = detect_change_points_iid(
            &weekly(&level_shift()),
            95.0,
            20,
            MartingaleType::Mixture,
            0.1,
        )
        .unwrap();
        let alerts = result.alert_indices();
        assert!(alerts.iter().all(|&i| i >= 30), "alerts: {alerts:?}");
    }

    #[test]
    fn missing_points_are_neutral() {
        let mut values = level_shift();
        values[10] = f64::NAN;
        let result =
            detect_change_points_iid(&weekly(&values), 95.0, 20, MartingaleType::Power, 0.1)
                .unwrap();
        assert!(result.missing[10]);
        assert_eq!(result.missing.iter().filter(|&&m| m).count(), 1);
        assert_eq!(result.predictions[10].as_slice(), &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn rejects_out_of_range_parameters() {
        let series = weekly(&level_shift());
        let err = detect_change_points_iid(&series, 100.0, 20, MartingaleType::Power, 0.1)
            .unwrap_err();
        assert_eq!(err.parameter(), Some("confidence"));

        let err = detect_change_points_iid(&series, 95.0, 0, MartingaleType::Power, 0.1)
            .unwrap_err();
        assert_eq!(err.parameter(), Some("change_history_length"));

        let err = detect_change_points_iid(&series, 95.0, 20, MartingaleType::Power, 1.0)
            .unwrap_err();
        assert_eq!(err.parameter(), Some("eps"));

        let err = detect_change_points_ssa(&series, 95.0, 20, 10, 20, MartingaleType::Power, 0.1)
            .unwrap_err();
        assert_eq!(err.parameter(), Some("training_window_size"));
    }

    #[test]
    fn ssa_detects_shift_in_seasonal_series() {
        let values: Vec<f64> = (0..80)
            .map(|t| {
                let season = 5.0 * (2.0 * std::f64::consts::PI * t as f64 / 4.0).sin();
                let level = if t < 50 { 20.0 } else { 60.0 };
                level + season
            })
            .collect();
        let result = detect_change_points_ssa(
            &weekly(&values),
            95.0,
            20,
            4,
            30,
            MartingaleType::Power,
            0.1,
        )
        .unwrap();
        let alerts = result.alert_indices();
        assert!(alerts.contains(&50), "alerts: {alerts:?}");
    }
}
