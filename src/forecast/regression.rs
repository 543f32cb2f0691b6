//! Regression of value on date with a named learner.
//!
//! The single feature is the day offset from the anchor date, standardized
//! with the training mean and standard deviation. The trained model keeps
//! those statistics so any future date can be scored.

use super::learners::{Learner, Regressor};
use crate::align::align_regression;
use crate::core::{days_since_anchor, ForecastRecord, OrderedSeries};
use crate::error::{Result, SignalError};
use crate::utils::stats::{mean, std_dev};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Configuration for [`train_regression_with`].
///
/// There is no `validate`: every learner and seed is accepted. Learner
/// names are checked when parsed into [`Learner`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegressionConfig {
    pub learner: Learner,
    /// Seed of the shuffling learners.
    pub seed: u64,
}

impl RegressionConfig {
    pub fn new(learner: Learner) -> Self {
        Self {
            learner,
            ..Default::default()
        }
    }

    pub fn learner(mut self, learner: Learner) -> Self {
        self.learner = learner;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// A fitted regression model. Cloning shares the trained learner.
#[derive(Debug, Clone)]
pub struct RegressionModel {
    learner: Learner,
    feature_mean: f64,
    feature_scale: f64,
    regressor: Arc<dyn Regressor>,
}

impl RegressionModel {
    pub fn learner(&self) -> Learner {
        self.learner
    }

    fn feature(&self, date: NaiveDate) -> f64 {
        (days_since_anchor(date) as f64 - self.feature_mean) / self.feature_scale
    }

    pub fn predict_date(&self, date: NaiveDate) -> f64 {
        self.regressor.predict(self.feature(date))
    }

    pub fn predict(&self, dates: &[NaiveDate]) -> Vec<f64> {
        dates.iter().map(|&d| self.predict_date(d)).collect()
    }
}

/// Output of [`train_regression`].
#[derive(Debug, Clone)]
pub struct RegressionTraining {
    /// In-sample predictions, one per source point (missing values included).
    pub fitted: Vec<f64>,
    /// `None` when the series was empty.
    pub model: Option<RegressionModel>,
}

/// Train the learner named `learner_name` (case-insensitive).
pub fn train_regression(learner_name: &str, series: &OrderedSeries) -> Result<RegressionTraining> {
    let learner: Learner = learner_name.parse()?;
    train_regression_with(series, &RegressionConfig::new(learner))
}

pub fn train_regression_with(
    series: &OrderedSeries,
    config: &RegressionConfig,
) -> Result<RegressionTraining> {
    if series.is_empty() {
        log::warn!("{} regression called with an empty series", config.learner);
        return Ok(RegressionTraining {
            fitted: Vec::new(),
            model: None,
        });
    }

    let offsets = series.day_offsets();
    let (x, y): (Vec<f64>, Vec<f64>) = offsets
        .iter()
        .zip(series.values())
        .filter(|(_, v)| v.is_finite())
        .map(|(&x, v)| (x, v))
        .unzip();
    if x.is_empty() {
        return Err(SignalError::InsufficientData { needed: 1, got: 0 });
    }

    let feature_mean = mean(&x);
    let sd = if x.len() > 1 { std_dev(&x) } else { 0.0 };
    let feature_scale = if sd > 0.0 && sd.is_finite() { sd } else { 1.0 };
    let standardized: Vec<f64> = x.iter().map(|v| (v - feature_mean) / feature_scale).collect();

    let mut regressor = config.learner.build(config.seed);
    regressor.fit(&standardized, &y)?;
    log::debug!(
        "trained {} regression on {} of {} points",
        config.learner,
        y.len(),
        series.len()
    );

    let model = RegressionModel {
        learner: config.learner,
        feature_mean,
        feature_scale,
        regressor: Arc::from(regressor),
    };
    let fitted = model.predict(&series.dates());
    Ok(RegressionTraining {
        fitted,
        model: Some(model),
    })
}

/// Predictions at arbitrary dates, flagged as forecasts.
pub fn forecast_regression(model: &RegressionModel, dates: &[NaiveDate]) -> Vec<ForecastRecord> {
    let values = model.predict(dates);
    // Lengths match by construction.
    align_regression(dates, &values, true).unwrap_or_default()
}

/// Predictions for `count` weekly dates starting at `start`.
pub fn forecast_regression_weekly(
    model: &RegressionModel,
    start: NaiveDate,
    count: usize,
) -> Vec<ForecastRecord> {
    let dates: Vec<NaiveDate> = (0..count)
        .map(|i| start + Duration::weeks(i as i64))
        .collect();
    forecast_regression(model, &dates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 3, 6).unwrap()
    }

    fn ramp(n: usize) -> OrderedSeries {
        let values: Vec<f64> = (0..n).map(|i| i as f64).collect();
        OrderedSeries::weekly(start(), &values)
    }

    #[test]
    fn ols_extrapolates_a_ramp() {
        let training = train_regression("OLS", &ramp(30)).unwrap();
        assert_relative_eq!(training.fitted[10], 10.0, epsilon = 1e-6);
        let model = training.model.unwrap();
        let records = forecast_regression_weekly(&model, start() + Duration::weeks(40), 2);
        assert_relative_eq!(records[0].value, 40.0, epsilon = 1e-6);
        assert_relative_eq!(records[1].value, 41.0, epsilon = 1e-6);
        assert!(records[0].is_forecasted && records[0].lower_bound.is_none());
    }

    #[test]
    fn every_learner_trains_on_a_count_series() {
        let series = ramp(30);
        for learner in Learner::ALL {
            let training = train_regression_with(&series, &RegressionConfig::new(learner)).unwrap();
            assert_eq!(training.fitted.len(), 30, "{learner}");
            assert!(training.fitted.iter().all(|v| v.is_finite()), "{learner}");
            assert_eq!(training.model.unwrap().learner(), learner);
        }
    }

    #[test]
    fn missing_labels_are_skipped() {
        let mut values: Vec<f64> = (0..20).map(|i| 2.0 * i as f64).collect();
        values[5] = f64::NAN;
        let series = OrderedSeries::weekly(start(), &values);
        let training = train_regression("ols", &series).unwrap();
        assert_relative_eq!(training.fitted[5], 10.0, epsilon = 1e-6);
    }

    #[test]
    fn empty_series_has_no_model() {
        let training = train_regression("FastTree", &OrderedSeries::new()).unwrap();
        assert!(training.fitted.is_empty());
        assert!(training.model.is_none());
    }

    #[test]
    fn all_missing_labels_are_insufficient() {
        let series = OrderedSeries::weekly(start(), &[f64::NAN; 4]);
        let err = train_regression("OLS", &series).unwrap_err();
        assert_eq!(err, SignalError::InsufficientData { needed: 1, got: 0 });
    }

    #[test]
    fn unknown_learner_is_rejected() {
        let err = train_regression("Prophet", &ramp(5)).unwrap_err();
        assert_eq!(err.parameter(), Some("learner"));
    }

    #[test]
    fn single_point_predicts_its_value() {
        let series = OrderedSeries::weekly(start(), &[7.0]);
        let model = train_regression("OLS", &series).unwrap().model.unwrap();
        assert_relative_eq!(model.predict_date(start() + Duration::weeks(3)), 7.0);
    }

    #[test]
    fn config_setters_select_learner_and_seed() {
        let config = RegressionConfig::default().learner(Learner::Sdca).seed(9);
        assert_eq!(config.learner, Learner::Sdca);
        assert_eq!(config.seed, 9);
        let a = train_regression_with(&ramp(20), &config).unwrap().fitted;
        let b = train_regression_with(&ramp(20), &config).unwrap().fitted;
        assert_eq!(a, b);
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: RegressionConfig = serde_json::from_str(r#"{"learner":"Poisson"}"#).unwrap();
        assert_eq!(config, RegressionConfig::new(Learner::Poisson));
        assert_eq!(config.seed, 0);
    }
}
