//! Timestamp-aligned output records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One source observation annotated with a detection outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub date: NaiveDate,
    pub is_alert: bool,
    /// Raw score for spikes/changepoints, the observed value for anomalies.
    pub score: f64,
    /// Rounded p-value for spikes/changepoints, magnitude for anomalies.
    pub uncertainty: f64,
    pub expected_value: Option<f64>,
}

/// A fitted or forecast value at a date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub date: NaiveDate,
    pub value: f64,
    pub lower_bound: Option<f64>,
    pub upper_bound: Option<f64>,
    /// `true` for future points, `false` for in-sample fitted values.
    pub is_forecasted: bool,
}

impl ForecastRecord {
    /// Width of the confidence interval, if bounds are present.
    pub fn interval_width(&self) -> Option<f64> {
        match (self.lower_bound, self.upper_bound) {
            (Some(lo), Some(hi)) => Some(hi - lo),
            _ => None,
        }
    }
}
