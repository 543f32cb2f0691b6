//! Point-anomaly ("spike") detection.
//!
//! Each observation gets a raw score (the value itself for [`DetectionMethod::Iid`],
//! the SSA one-step residual for [`DetectionMethod::Ssa`]) that is ranked
//! against a sliding history of earlier scores. A spike is raised when the
//! resulting p-value falls below `1 - confidence / 100`.

use crate::core::{OrderedSeries, PredictionVector};
use crate::error::{Result, SignalError};
use crate::scoring::{alert_threshold, AnomalySide, PValueHistory};
use crate::ssa::{SeasonalDecomposer, SsaConfig};
use serde::{Deserialize, Serialize};

/// Where raw scores come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DetectionMethod {
    /// Raw values, assumed independent and identically distributed.
    #[default]
    Iid,
    /// Residuals of an SSA seasonal model.
    Ssa,
}

/// Configuration for spike detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpikeConfig {
    pub method: DetectionMethod,
    /// Number of past scores the p-value is computed against.
    pub p_value_history_length: usize,
    /// Confidence percentage in (0, 100).
    pub confidence: f64,
    pub side: AnomalySide,
    /// SSA training window (`L`, also the training size).
    pub training_window_size: usize,
    /// SSA embedding window (`W`).
    pub seasonality_window_size: usize,
}

impl Default for SpikeConfig {
    fn default() -> Self {
        Self {
            method: DetectionMethod::Iid,
            p_value_history_length: 30,
            confidence: 95.0,
            side: AnomalySide::TwoSided,
            training_window_size: 100,
            seasonality_window_size: 10,
        }
    }
}

impl SpikeConfig {
    /// IID detection with the given history length and confidence.
    pub fn iid(p_value_history_length: usize, confidence: f64) -> Self {
        Self {
            method: DetectionMethod::Iid,
            p_value_history_length,
            confidence,
            ..Default::default()
        }
    }

    /// SSA detection with the given windows.
    pub fn ssa(
        p_value_history_length: usize,
        seasonality_window_size: usize,
        training_window_size: usize,
        confidence: f64,
    ) -> Self {
        Self {
            method: DetectionMethod::Ssa,
            p_value_history_length,
            confidence,
            training_window_size,
            seasonality_window_size,
            ..Default::default()
        }
    }

    pub fn side(mut self, side: AnomalySide) -> Self {
        self.side = side;
        self
    }

    pub fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn p_value_history_length(mut self, len: usize) -> Self {
        self.p_value_history_length = len;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_confidence(self.confidence)?;
        if self.p_value_history_length == 0 {
            return Err(SignalError::config(
                "p_value_history_length",
                "must be at least 1",
            ));
        }
        if self.method == DetectionMethod::Ssa {
            validate_ssa_windows(self.seasonality_window_size, self.training_window_size)?;
        }
        Ok(())
    }

    fn ssa_config(&self) -> SsaConfig {
        ssa_detector_config(self.seasonality_window_size, self.training_window_size)
    }
}

/// Confidence percentages must lie strictly inside (0, 100).
pub(crate) fn validate_confidence(confidence: f64) -> Result<()> {
    if !(confidence > 0.0 && confidence < 100.0) {
        return Err(SignalError::config(
            "confidence",
            format!("must be in (0, 100), got {confidence}"),
        ));
    }
    Ok(())
}

pub(crate) fn validate_ssa_windows(seasonality: usize, training: usize) -> Result<()> {
    if seasonality < 2 {
        return Err(SignalError::config(
            "seasonality_window_size",
            format!("must be at least 2, got {seasonality}"),
        ));
    }
    if training <= 2 * seasonality {
        return Err(SignalError::config(
            "training_window_size",
            format!(
                "must exceed twice the seasonality_window_size ({}), got {training}",
                2 * seasonality
            ),
        ));
    }
    Ok(())
}

pub(crate) fn ssa_detector_config(seasonality: usize, training: usize) -> SsaConfig {
    SsaConfig::new(seasonality, training, training).horizon(1)
}

/// Detect spikes; one `[is_alert, raw_score, p_value]` vector per point.
pub fn detect_spikes(series: &OrderedSeries, config: &SpikeConfig) -> Result<Vec<PredictionVector>> {
    config.validate()?;
    let values = series.values();

    let raw_scores = match config.method {
        DetectionMethod::Iid => {
            series.require_len(1)?;
            values
        }
        DetectionMethod::Ssa => {
            series.require_len(2 * config.seasonality_window_size + 1)?;
            let decomposer = SeasonalDecomposer::new(config.ssa_config())?;
            decomposer.decompose(&values)?.residuals
        }
    };

    let mut history = PValueHistory::new(config.p_value_history_length, config.side);
    let threshold = alert_threshold(config.confidence);
    let mut neutral = 0usize;

    let predictions = raw_scores
        .into_iter()
        .map(|raw| {
            if !raw.is_finite() {
                neutral += 1;
                return PredictionVector::neutral_alert();
            }
            let p = history.score(raw);
            PredictionVector::alert(p < threshold, raw, p)
        })
        .collect();

    if neutral > 0 {
        log::debug!("spike detection: {neutral} points without a score treated as neutral");
    }
    Ok(predictions)
}

/// IID spike detection.
pub fn detect_spikes_iid(
    series: &OrderedSeries,
    p_value_history_length: usize,
    confidence: f64,
    side: AnomalySide,
) -> Result<Vec<PredictionVector>> {
    let config = SpikeConfig::iid(p_value_history_length, confidence).side(side);
    detect_spikes(series, &config)
}

/// SSA spike detection with embedding window `window` and training window
/// `training_window`.
pub fn detect_spikes_ssa(
    series: &OrderedSeries,
    p_value_history_length: usize,
    window: usize,
    training_window: usize,
    confidence: f64,
    side: AnomalySide,
) -> Result<Vec<PredictionVector>> {
    let config =
        SpikeConfig::ssa(p_value_history_length, window, training_window, confidence).side(side);
    detect_spikes(series, &config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn weekly(values: &[f64]) -> OrderedSeries {
        OrderedSeries::weekly(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(), values)
    }

    fn ramp_with_outlier() -> OrderedSeries {
        let values: Vec<f64> = (0..40)
            .map(|i| if i == 24 { 24.0 * 8.0 } else { i as f64 })
            .collect();
        weekly(&values)
    }

    #[test]
    fn iid_flags_injected_outlier() {
        let predictions =
            detect_spikes_iid(&ramp_with_outlier(), 20, 99.0, AnomalySide::TwoSided).unwrap();
        assert_eq!(predictions.len(), 40);
        assert!(predictions[24].is_alert());
        assert_eq!(predictions[24].score(), 192.0);
        let others = predictions
            .iter()
            .enumerate()
            .filter(|(i, p)| *i != 24 && p.is_alert())
            .count();
        assert!(others <= 2);
    }

    #[test]
    fn first_point_is_neutral() {
        let predictions =
            detect_spikes_iid(&ramp_with_outlier(), 20, 99.0, AnomalySide::TwoSided).unwrap();
        assert_eq!(predictions[0].as_slice(), &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn negative_side_ignores_upward_spike() {
        let predictions =
            detect_spikes_iid(&ramp_with_outlier(), 20, 99.0, AnomalySide::Negative).unwrap();
        assert!(!predictions[24].is_alert());
    }

    #[test]
    fn confidence_is_validated_not_clamped() {
        for confidence in [0.0, 100.0, 150.0, -1.0, f64::NAN] {
            let err = detect_spikes_iid(&ramp_with_outlier(), 20, confidence, AnomalySide::TwoSided)
                .unwrap_err();
            assert_eq!(err.parameter(), Some("confidence"));
        }
    }

    #[test]
    fn empty_series_is_insufficient() {
        let err = detect_spikes_iid(&OrderedSeries::new(), 5, 95.0, AnomalySide::TwoSided)
            .unwrap_err();
        assert_eq!(err, SignalError::InsufficientData { needed: 1, got: 0 });
    }

    #[test]
    fn ssa_flags_spike_on_seasonal_series() {
        let mut values: Vec<f64> = (0..60)
            .map(|t| 100.0 + 10.0 * (2.0 * std::f64::consts::PI * t as f64 / 6.0).sin())
            .collect();
        values[45] += 60.0;
        let predictions =
            detect_spikes_ssa(&weekly(&values), 15, 6, 30, 99.0, AnomalySide::TwoSided).unwrap();
        assert_eq!(predictions.len(), 60);
        assert!(predictions.iter().all(|p| p.len() == 3));
        assert!(predictions[45].is_alert());
        assert!(predictions[45].score() > 50.0);
    }

    #[test]
    fn ssa_validates_window_relationship() {
        let err = detect_spikes_ssa(&ramp_with_outlier(), 10, 8, 16, 95.0, AnomalySide::TwoSided)
            .unwrap_err();
        assert_eq!(err.parameter(), Some("training_window_size"));

        let short = weekly(&[1.0; 10]);
        let err = detect_spikes_ssa(&short, 10, 8, 40, 95.0, AnomalySide::TwoSided).unwrap_err();
        assert_eq!(err, SignalError::InsufficientData { needed: 17, got: 10 });
    }
}
