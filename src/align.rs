//! Mapping of per-index engine outputs back to source dates.
//!
//! Every engine produces one row per series index; the aligner pairs rows
//! with dates, applies the uncertainty rounding policy and, on request,
//! keeps only the alerting rows.

use crate::core::{AlertRecord, Forecast, ForecastRecord, OrderedSeries, PredictionVector};
use crate::error::{Result, SignalError};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Presentation policy for aligned alert records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentPolicy {
    /// Keep only rows whose alert flag is set.
    pub alerts_only: bool,
    /// Uncertainties below this value are reported as 0.
    pub uncertainty_floor: f64,
    /// Decimal places kept in reported uncertainties.
    pub decimals: u32,
}

impl Default for AlignmentPolicy {
    fn default() -> Self {
        Self {
            alerts_only: true,
            uncertainty_floor: 0.001,
            decimals: 3,
        }
    }
}

impl AlignmentPolicy {
    pub fn alerts_only(mut self, alerts_only: bool) -> Self {
        self.alerts_only = alerts_only;
        self
    }

    pub fn uncertainty_floor(mut self, uncertainty_floor: f64) -> Self {
        self.uncertainty_floor = uncertainty_floor;
        self
    }

    pub fn decimals(mut self, decimals: u32) -> Self {
        self.decimals = decimals;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.uncertainty_floor.is_nan() || self.uncertainty_floor < 0.0 {
            return Err(SignalError::config(
                "uncertainty_floor",
                format!("must be non-negative, got {}", self.uncertainty_floor),
            ));
        }
        if self.decimals > 15 {
            return Err(SignalError::config(
                "decimals",
                format!("must be at most 15, got {}", self.decimals),
            ));
        }
        Ok(())
    }

    /// NaN or sub-floor values become 0; everything else is rounded.
    pub fn clamp_uncertainty(&self, value: f64) -> f64 {
        if value.is_nan() || value < self.uncertainty_floor {
            return 0.0;
        }
        let scale = 10f64.powi(self.decimals as i32);
        (value * scale).round() / scale
    }
}

fn require_same_len(series: &OrderedSeries, got: usize) -> Result<()> {
    if series.len() != got {
        return Err(SignalError::DimensionMismatch {
            expected: series.len(),
            got,
        });
    }
    Ok(())
}

fn align_alert_rows(
    series: &OrderedSeries,
    predictions: &[PredictionVector],
    policy: &AlignmentPolicy,
    record: impl Fn(NaiveDate, f64, &PredictionVector) -> AlertRecord,
) -> Result<Vec<AlertRecord>> {
    policy.validate()?;
    require_same_len(series, predictions.len())?;
    Ok(series
        .points()
        .iter()
        .zip(predictions)
        .filter(|(_, p)| !policy.alerts_only || p.is_alert())
        .map(|(point, p)| record(point.date(), point.value(), p))
        .collect())
}

/// Spike rows: score is the raw score, uncertainty the rounded p-value.
pub fn align_spikes(
    series: &OrderedSeries,
    predictions: &[PredictionVector],
    policy: &AlignmentPolicy,
) -> Result<Vec<AlertRecord>> {
    align_alert_rows(series, predictions, policy, |date, _, p| AlertRecord {
        date,
        is_alert: p.is_alert(),
        score: p.score(),
        uncertainty: policy.clamp_uncertainty(p.uncertainty()),
        expected_value: None,
    })
}

/// Changepoint rows share the spike layout.
pub fn align_changepoints(
    series: &OrderedSeries,
    predictions: &[PredictionVector],
    policy: &AlignmentPolicy,
) -> Result<Vec<AlertRecord>> {
    align_spikes(series, predictions, policy)
}

/// Anomaly rows report the observed value as score and the magnitude as
/// uncertainty. Expected values come along when the rows carry them.
pub fn align_anomalies(
    series: &OrderedSeries,
    predictions: &[PredictionVector],
    policy: &AlignmentPolicy,
) -> Result<Vec<AlertRecord>> {
    align_alert_rows(series, predictions, policy, |date, value, p| AlertRecord {
        date,
        is_alert: p.is_alert(),
        score: value,
        uncertainty: policy.clamp_uncertainty(p.uncertainty()),
        expected_value: p.expected_value(),
    })
}

/// In-sample SSA predictions; rows without a finite prediction are dropped.
pub fn align_ssa_fitted(series: &OrderedSeries, fitted: &Forecast) -> Result<Vec<ForecastRecord>> {
    require_same_len(series, fitted.horizon())?;
    Ok(series
        .points()
        .iter()
        .enumerate()
        .filter_map(|(i, point)| {
            let (value, lower, upper) = fitted.step(i)?;
            value.is_finite().then_some(ForecastRecord {
                date: point.date(),
                value,
                lower_bound: lower,
                upper_bound: upper,
                is_forecasted: false,
            })
        })
        .collect())
}

/// Future SSA steps dated weekly from `start`.
pub fn align_ssa_forecast(start: NaiveDate, forecast: &Forecast) -> Vec<ForecastRecord> {
    (0..forecast.horizon())
        .filter_map(|h| {
            let (value, lower, upper) = forecast.step(h)?;
            Some(ForecastRecord {
                date: start + Duration::weeks(h as i64),
                value,
                lower_bound: lower,
                upper_bound: upper,
                is_forecasted: true,
            })
        })
        .collect()
}

/// Regression predictions at explicit dates; no bounds are produced.
pub fn align_regression(
    dates: &[NaiveDate],
    values: &[f64],
    is_forecasted: bool,
) -> Result<Vec<ForecastRecord>> {
    if dates.len() != values.len() {
        return Err(SignalError::DimensionMismatch {
            expected: dates.len(),
            got: values.len(),
        });
    }
    Ok(dates
        .iter()
        .zip(values)
        .map(|(&date, &value)| ForecastRecord {
            date,
            value,
            lower_bound: None,
            upper_bound: None,
            is_forecasted,
        })
        .collect())
}
