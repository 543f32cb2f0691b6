//! Seasonal forecasting through the SSA decomposer.

use crate::align::align_ssa_forecast;
use crate::core::{Forecast, ForecastRecord, OrderedSeries};
use crate::error::Result;
use crate::ssa::{SeasonalDecomposer, SsaConfig, SsaModel};
use crate::utils::quantile_normal;
use chrono::NaiveDate;

/// A trained SSA forecaster together with the configuration that built it.
#[derive(Debug, Clone, PartialEq)]
pub struct SsaTrainedModel {
    model: SsaModel,
    last_date: Option<NaiveDate>,
}

impl SsaTrainedModel {
    pub fn config(&self) -> &SsaConfig {
        self.model.config()
    }

    pub fn model(&self) -> &SsaModel {
        &self.model
    }

    /// Date of the last training observation.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.last_date
    }

    /// Point forecast and bounds for `horizon` steps.
    pub fn forecast(&self, horizon: usize) -> Forecast {
        self.model.forecast(horizon)
    }
}

/// Output of [`train_ssa`].
#[derive(Debug, Clone)]
pub struct SsaTraining {
    /// One-step in-sample predictions with `±z·σ` bounds; `NaN` before `W - 1`.
    pub fitted: Forecast,
    /// `None` when the series was empty.
    pub model: Option<SsaTrainedModel>,
}

/// Train an SSA forecaster.
///
/// The configuration is validated first, so a window/training-size conflict
/// is reported even for an empty series. An empty series then yields an
/// empty result without a model.
pub fn train_ssa(
    series: &OrderedSeries,
    window_size: usize,
    series_length: usize,
    train_size: usize,
    adaptive: bool,
    confidence: f64,
) -> Result<SsaTraining> {
    let config = SsaConfig::new(window_size, series_length, train_size)
        .adaptive(adaptive)
        .confidence(confidence);
    train_ssa_with(series, config)
}

/// [`train_ssa`] with a full configuration.
pub fn train_ssa_with(series: &OrderedSeries, config: SsaConfig) -> Result<SsaTraining> {
    let decomposer = SeasonalDecomposer::new(config)?;
    if series.is_empty() {
        log::warn!("SSA training called with an empty series");
        return Ok(SsaTraining {
            fitted: Forecast::new(),
            model: None,
        });
    }

    let decomposition = decomposer.decompose(&series.values())?;
    let model = decomposition.model().clone();
    let half_width = quantile_normal((1.0 + model.config().confidence) / 2.0) * model.sigma();
    let predictions = decomposition.predictions;
    let lower = predictions.iter().map(|p| p - half_width).collect();
    let upper = predictions.iter().map(|p| p + half_width).collect();
    let fitted = Forecast::from_values_with_intervals(predictions, lower, upper)?;

    Ok(SsaTraining {
        fitted,
        model: Some(SsaTrainedModel {
            model,
            last_date: series.last().map(|p| p.date()),
        }),
    })
}

/// Forecast `count` weekly steps, the first dated `start`.
pub fn forecast_ssa(model: &SsaTrainedModel, start: NaiveDate, count: usize) -> Vec<ForecastRecord> {
    align_ssa_forecast(start, &model.forecast(count))
}

/// Forecast the configured `horizon` weekly steps, the first dated `start`.
pub fn forecast_ssa_default(model: &SsaTrainedModel, start: NaiveDate) -> Vec<ForecastRecord> {
    align_ssa_forecast(start, &model.model.forecast_default())
}
