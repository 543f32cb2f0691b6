//! Batch anomaly detection by spectral residual.
//!
//! Pipeline per batch:
//! 1. resolve the seasonal period (fixed or detected once on the whole series),
//! 2. remove the seasonal component ([`DeseasonalityMode`]),
//! 3. score every point by spectral residual saliency,
//! 4. optionally reconstruct an expected value and a sensitivity-scaled margin.

use super::periodicity::{period_or_zero, PeriodSetting, PeriodicityConfig};
use super::spectral_residual::saliency_map;
use super::fft::low_pass;
use crate::core::prediction::flag;
use crate::core::{forward_fill, OrderedSeries, PredictionVector};
use crate::error::{Result, SignalError};
use crate::seasonality::{deseasonalize, DeseasonalityMode};
use crate::utils::ols::line_fit;
use crate::utils::stats::{median, robust_scale, std_dev};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Shortest series (and shortest batch) the detector accepts.
pub const MIN_SERIES_LENGTH: usize = 12;

/// Normal points preceding an anomaly used to estimate its replacement.
const REPLACEMENT_NEIGHBOURS: usize = 5;
/// Share of the frequency range kept when smoothing towards the expected value.
const EXPECTED_VALUE_BANDWIDTH: f64 = 0.25;
const MIN_BOUNDARY_UNIT: f64 = 1e-3;
const RELATIVE_BOUNDARY_UNIT: f64 = 0.01;

/// What each output vector carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AnomalyMode {
    /// `[is_anomaly, raw_score, magnitude]`
    #[default]
    #[serde(alias = "AnomalyOnly")]
    ScoreOnly,
    /// `[is_anomaly, raw_score, magnitude, expected_value]`
    #[serde(alias = "ScoreAndExpectedValue", alias = "AnomalyAndExpectedValue")]
    ExpectedValue,
    /// `[is_anomaly, anomaly_score, magnitude, expected_value, boundary_unit, upper_bound, lower_bound]`
    #[serde(alias = "ScoreAndMargin", alias = "AnomalyAndMargin")]
    Margin,
}

impl AnomalyMode {
    pub fn slot_count(self) -> usize {
        match self {
            AnomalyMode::ScoreOnly => 3,
            AnomalyMode::ExpectedValue => 4,
            AnomalyMode::Margin => 7,
        }
    }
}

/// Configuration for [`SpectralAnomalyEngine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// Raw-score threshold in [0, 1].
    pub threshold: f64,
    /// `-1` for the whole series at once, otherwise at least 12.
    pub batch_size: i64,
    /// Margin sensitivity in [0, 100]; higher means a narrower band.
    pub sensitivity: f64,
    pub mode: AnomalyMode,
    pub period: PeriodSetting,
    pub deseasonality: DeseasonalityMode,
    pub periodicity: PeriodicityConfig,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            threshold: 0.3,
            batch_size: -1,
            sensitivity: 99.0,
            mode: AnomalyMode::ScoreOnly,
            period: PeriodSetting::Auto,
            deseasonality: DeseasonalityMode::Stl,
            periodicity: PeriodicityConfig::default(),
        }
    }
}

impl AnomalyConfig {
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn batch_size(mut self, batch_size: i64) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn sensitivity(mut self, sensitivity: f64) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    pub fn mode(mut self, mode: AnomalyMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn period(mut self, period: PeriodSetting) -> Self {
        self.period = period;
        self
    }

    pub fn deseasonality(mut self, deseasonality: DeseasonalityMode) -> Self {
        self.deseasonality = deseasonality;
        self
    }

    pub fn periodicity(mut self, periodicity: PeriodicityConfig) -> Self {
        self.periodicity = periodicity;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(SignalError::config(
                "threshold",
                format!("must be in [0, 1], got {}", self.threshold),
            ));
        }
        if self.batch_size != -1 && self.batch_size < MIN_SERIES_LENGTH as i64 {
            return Err(SignalError::config(
                "batch_size",
                format!(
                    "must be -1 or at least {MIN_SERIES_LENGTH}, got {}",
                    self.batch_size
                ),
            ));
        }
        if !(0.0..=100.0).contains(&self.sensitivity) {
            return Err(SignalError::config(
                "sensitivity",
                format!("must be in [0, 100], got {}", self.sensitivity),
            ));
        }
        Ok(())
    }

    /// Margin multiplier `0.5 · 2^((100 − sensitivity) / 10)`.
    pub fn margin_factor(&self) -> f64 {
        0.5 * 2f64.powf((100.0 - self.sensitivity) / 10.0)
    }
}

/// Output of [`SpectralAnomalyEngine::detect`].
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyResult {
    pub predictions: Vec<PredictionVector>,
    /// Seasonal period used; 0 when the series had none.
    pub period: usize,
}

impl AnomalyResult {
    pub fn anomaly_indices(&self) -> Vec<usize> {
        self.predictions
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_alert())
            .map(|(i, _)| i)
            .collect()
    }
}

struct BatchScores {
    raw: Vec<f64>,
    magnitude: Vec<f64>,
    is_anomaly: Vec<bool>,
    expected: Vec<f64>,
}

/// Spectral residual anomaly detector.
#[derive(Debug, Clone)]
pub struct SpectralAnomalyEngine {
    config: AnomalyConfig,
}

impl SpectralAnomalyEngine {
    pub fn new(config: AnomalyConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnomalyConfig {
        &self.config
    }

    pub fn detect(&self, series: &OrderedSeries) -> Result<AnomalyResult> {
        let config = &self.config;
        series.require_len(MIN_SERIES_LENGTH)?;
        if series.has_missing() {
            log::debug!("anomaly detection: forward-filling missing values");
        }
        let values = forward_fill(&series.values());

        let period = config.period.resolve(&values, &config.periodicity);
        if period.is_none() && config.period == PeriodSetting::Auto {
            log::warn!("no seasonal period detected; continuing with period 0");
        }

        let batches = batch_ranges(values.len(), config.batch_size);
        log::debug!(
            "anomaly detection: {} points in {} batch(es), period {}",
            values.len(),
            batches.len(),
            period_or_zero(period)
        );

        let needs_expected = config.mode != AnomalyMode::ScoreOnly;
        let mut scores = BatchScores {
            raw: Vec::with_capacity(values.len()),
            magnitude: Vec::with_capacity(values.len()),
            is_anomaly: Vec::with_capacity(values.len()),
            expected: Vec::with_capacity(values.len()),
        };
        for range in batches {
            let batch = &values[range];
            let parts = deseasonalize(batch, period, config.deseasonality);
            let map = saliency_map(&parts.adjusted);
            let flags: Vec<bool> = map.raw_score.iter().map(|&r| r > config.threshold).collect();

            if needs_expected {
                let smooth = expected_values(&parts.adjusted, &flags);
                scores
                    .expected
                    .extend(smooth.iter().zip(&parts.seasonal).map(|(e, s)| e + s));
            }
            scores.raw.extend(map.raw_score);
            scores.magnitude.extend(map.magnitude);
            scores.is_anomaly.extend(flags);
        }

        let predictions = match config.mode {
            AnomalyMode::ScoreOnly => (0..values.len())
                .map(|i| {
                    PredictionVector::from_slots([
                        flag(scores.is_anomaly[i]),
                        scores.raw[i],
                        scores.magnitude[i],
                    ])
                })
                .collect(),
            AnomalyMode::ExpectedValue => (0..values.len())
                .map(|i| {
                    PredictionVector::from_slots([
                        flag(scores.is_anomaly[i]),
                        scores.raw[i],
                        scores.magnitude[i],
                        scores.expected[i],
                    ])
                })
                .collect(),
            AnomalyMode::Margin => margin_vectors(&values, &scores, config.margin_factor()),
        };

        Ok(AnomalyResult {
            predictions,
            period: period_or_zero(period),
        })
    }
}

/// Detect anomalies with an explicit parameter list.
pub fn detect_anomalies(
    series: &OrderedSeries,
    threshold: f64,
    batch_size: i64,
    sensitivity: f64,
    mode: AnomalyMode,
    period: PeriodSetting,
    deseasonality: DeseasonalityMode,
) -> Result<Vec<PredictionVector>> {
    let config = AnomalyConfig::default()
        .threshold(threshold)
        .batch_size(batch_size)
        .sensitivity(sensitivity)
        .mode(mode)
        .period(period)
        .deseasonality(deseasonality);
    Ok(SpectralAnomalyEngine::new(config)?.detect(series)?.predictions)
}

/// Split `n` points into batches; a short trailing batch joins the previous one.
pub fn batch_ranges(n: usize, batch_size: i64) -> Vec<Range<usize>> {
    if batch_size < MIN_SERIES_LENGTH as i64 || n <= batch_size as usize {
        return vec![0..n];
    }
    let size = batch_size as usize;
    let mut ranges: Vec<Range<usize>> = (0..n).step_by(size).map(|s| s..(s + size).min(n)).collect();
    if let Some(last) = ranges.last().cloned() {
        if last.len() < MIN_SERIES_LENGTH && ranges.len() > 1 {
            ranges.pop();
            if let Some(prev) = ranges.last_mut() {
                prev.end = last.end;
            }
        }
    }
    ranges
}

/// Smooth reconstruction of `adjusted` with anomalies replaced first.
fn expected_values(adjusted: &[f64], is_anomaly: &[bool]) -> Vec<f64> {
    let normal: Vec<f64> = adjusted
        .iter()
        .zip(is_anomaly)
        .filter(|(_, &a)| !a)
        .map(|(v, _)| *v)
        .collect();
    let fallback = if normal.is_empty() { median(adjusted) } else { median(&normal) };

    let mut replaced = adjusted.to_vec();
    for i in (0..adjusted.len()).filter(|&i| is_anomaly[i]) {
        let neighbours: Vec<usize> = (0..i)
            .rev()
            .filter(|&j| !is_anomaly[j])
            .take(REPLACEMENT_NEIGHBOURS)
            .collect();
        replaced[i] = match neighbours.len() {
            0 => fallback,
            1 => adjusted[neighbours[0]],
            _ => {
                let x: Vec<f64> = neighbours.iter().map(|&j| j as f64).collect();
                let y: Vec<f64> = neighbours.iter().map(|&j| adjusted[j]).collect();
                line_fit(&x, &y)
                    .map(|fit| fit.predict_one(&[i as f64]))
                    .unwrap_or(adjusted[neighbours[0]])
            }
        };
    }
    low_pass(&replaced, EXPECTED_VALUE_BANDWIDTH)
}

fn margin_vectors(values: &[f64], scores: &BatchScores, factor: f64) -> Vec<PredictionVector> {
    let residuals: Vec<f64> = values
        .iter()
        .zip(&scores.expected)
        .zip(&scores.is_anomaly)
        .filter(|(_, &a)| !a)
        .map(|((v, e), _)| v - e)
        .collect();
    let mut scale = robust_scale(&residuals);
    if !(scale.is_finite() && scale > 0.0) {
        scale = std_dev(&residuals);
    }
    if !scale.is_finite() {
        scale = 0.0;
    }

    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let expected = scores.expected[i];
            let unit = scale
                .max(RELATIVE_BOUNDARY_UNIT * expected.abs())
                .max(MIN_BOUNDARY_UNIT);
            let margin = unit * factor;
            let upper = expected + margin;
            let lower = expected - margin;
            let is_anomaly = scores.is_anomaly[i] && (v > upper || v < lower);
            let anomaly_score = if is_anomaly {
                let d = (v - expected).abs() / margin;
                d / (1.0 + d)
            } else {
                0.0
            };
            PredictionVector::from_slots([
                flag(is_anomaly),
                anomaly_score,
                scores.magnitude[i],
                expected,
                unit,
                upper,
                lower,
            ])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::f64::consts::PI;

    fn weekly(values: &[f64]) -> OrderedSeries {
        OrderedSeries::weekly(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(), values)
    }

    /// Period-12 cycle around 100 with a +25 spike at index 60.
    fn seasonal_with_spike() -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(11);
        let mut values: Vec<f64> = (0..96)
            .map(|i| {
                100.0 + 5.0 * (2.0 * PI * i as f64 / 12.0).sin() + rng.gen_range(-0.5..0.5)
            })
            .collect();
        values[60] += 25.0;
        values
    }

    fn engine(config: AnomalyConfig) -> SpectralAnomalyEngine {
        SpectralAnomalyEngine::new(config).unwrap()
    }

    #[test]
    fn score_only_flags_spike() {
        let result = engine(AnomalyConfig::default().period(PeriodSetting::Fixed(12)))
            .detect(&weekly(&seasonal_with_spike()))
            .unwrap();
        assert_eq!(result.predictions.len(), 96);
        assert!(result.predictions.iter().all(|p| p.len() == 3));
        let anomalies = result.anomaly_indices();
        assert!(anomalies.contains(&60), "anomalies: {anomalies:?}");
        assert!(anomalies.len() <= 3, "anomalies: {anomalies:?}");
        assert_eq!(result.period, 12);
    }

    #[test]
    fn auto_period_is_reported() {
        let result = engine(AnomalyConfig::default())
            .detect(&weekly(&seasonal_with_spike()))
            .unwrap();
        assert_eq!(result.period, 12);
        assert!(result.predictions[60].is_alert());
    }

    #[test]
    fn expected_value_mode_reconstructs_level() {
        let result = engine(
            AnomalyConfig::default()
                .period(PeriodSetting::Fixed(12))
                .mode(AnomalyMode::ExpectedValue),
        )
        .detect(&weekly(&seasonal_with_spike()))
        .unwrap();
        assert!(result.predictions.iter().all(|p| p.len() == 4));
        let expected = result.predictions[60].expected_value().unwrap();
        assert!((expected - 100.0).abs() < 3.0, "expected {expected}");
    }

    #[test]
    fn margin_mode_bounds_bracket_expected_value() {
        let values = seasonal_with_spike();
        let result = engine(
            AnomalyConfig::default()
                .period(PeriodSetting::Fixed(12))
                .mode(AnomalyMode::Margin),
        )
        .detect(&weekly(&values))
        .unwrap();

        for p in &result.predictions {
            assert_eq!(p.len(), 7);
            assert!(p[4] >= MIN_BOUNDARY_UNIT);
            assert!(p[5] > p[3] && p[3] > p[6]);
            assert!((0.0..1.0).contains(&p[1]));
        }
        let spike = &result.predictions[60];
        assert!(spike.is_alert());
        assert!(values[60] > spike[5]);
        assert!(spike.score() > 0.5);
    }

    #[test]
    fn lower_sensitivity_widens_margin() {
        let config = AnomalyConfig::default();
        assert_relative_eq!(config.sensitivity(100.0).margin_factor(), 0.5);
        assert_relative_eq!(AnomalyConfig::default().sensitivity(90.0).margin_factor(), 1.0);
    }

    #[test]
    fn constant_series_has_no_anomalies() {
        let result = engine(AnomalyConfig::default().mode(AnomalyMode::Margin))
            .detect(&weekly(&[10.0; 30]))
            .unwrap();
        assert!(result.anomaly_indices().is_empty());
        assert_eq!(result.period, 0);
        assert_relative_eq!(result.predictions[5][3], 10.0, epsilon = 1e-9);
        assert_relative_eq!(result.predictions[5][4], 0.1, epsilon = 1e-9);
    }

    #[test]
    fn rejects_invalid_parameters() {
        let series = weekly(&seasonal_with_spike());
        let cases = [
            (AnomalyConfig::default().threshold(1.5), "threshold"),
            (AnomalyConfig::default().batch_size(5), "batch_size"),
            (AnomalyConfig::default().batch_size(0), "batch_size"),
            (AnomalyConfig::default().batch_size(-2), "batch_size"),
            (AnomalyConfig::default().sensitivity(101.0), "sensitivity"),
        ];
        for (config, parameter) in cases {
            let err = SpectralAnomalyEngine::new(config).unwrap_err();
            assert_eq!(err.parameter(), Some(parameter));
        }
        let err = detect_anomalies(
            &series,
            0.3,
            7,
            99.0,
            AnomalyMode::ScoreOnly,
            PeriodSetting::Auto,
            DeseasonalityMode::Stl,
        )
        .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn short_series_is_insufficient() {
        let err = engine(AnomalyConfig::default())
            .detect(&weekly(&[1.0; 11]))
            .unwrap_err();
        assert_eq!(err, SignalError::InsufficientData { needed: 12, got: 11 });
    }

    #[test]
    fn trailing_short_batch_is_merged() {
        assert_eq!(batch_ranges(30, 12), vec![0..12, 12..30]);
        assert_eq!(batch_ranges(36, 12), vec![0..12, 12..24, 24..36]);
        assert_eq!(batch_ranges(30, -1), vec![0..30]);
        assert_eq!(batch_ranges(10, 12), vec![0..10]);
    }

    #[test]
    fn batched_output_covers_every_point() {
        let result = engine(
            AnomalyConfig::default()
                .batch_size(48)
                .period(PeriodSetting::Fixed(12))
                .mode(AnomalyMode::ExpectedValue),
        )
        .detect(&weekly(&seasonal_with_spike()))
        .unwrap();
        assert_eq!(result.predictions.len(), 96);
        assert!(result.predictions[60].is_alert());
    }

    #[test]
    fn missing_values_are_filled() {
        let mut values = seasonal_with_spike();
        values[10] = f64::NAN;
        let result = engine(AnomalyConfig::default().mode(AnomalyMode::Margin))
            .detect(&weekly(&values))
            .unwrap();
        assert!(result
            .predictions
            .iter()
            .all(|p| p.as_slice().iter().all(|v| v.is_finite())));
    }

    #[test]
    fn mode_accepts_service_names() {
        let parse = |name: &str| serde_json::from_str::<AnomalyMode>(&format!("\"{name}\"")).unwrap();
        assert_eq!(parse("AnomalyOnly"), AnomalyMode::ScoreOnly);
        assert_eq!(parse("ScoreAndExpectedValue"), AnomalyMode::ExpectedValue);
        assert_eq!(parse("AnomalyAndExpectedValue"), AnomalyMode::ExpectedValue);
        assert_eq!(parse("ScoreAndMargin"), AnomalyMode::Margin);
        assert_eq!(parse("Margin"), AnomalyMode::Margin);

        let config: AnomalyConfig = serde_json::from_str(r#"{"mode":"AnomalyAndMargin"}"#).unwrap();
        assert_eq!(config.mode, AnomalyMode::Margin);
        assert_eq!(config.mode.slot_count(), 7);
    }
}
