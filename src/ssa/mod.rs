//! Singular Spectrum Analysis (SSA) decomposition.
//!
//! The decomposer embeds the training segment of a series into a trajectory
//! matrix, eigen-decomposes its lag covariance, keeps a low-rank signal
//! subspace and derives a linear recurrence from it. The recurrence drives
//! both the one-step residuals consumed by the spike and changepoint engines
//! and the multi-step forecasts of the forecaster.

mod recurrence;

pub use recurrence::LinearRecurrence;

use crate::core::{forward_fill, Forecast};
use crate::error::{Result, SignalError};
use crate::utils::{quantile_normal, symmetric_eigen, SymmetricEigen};
use serde::{Deserialize, Serialize};

/// Share of eigen-energy retained by [`RankSelection::Fast`].
const FAST_RANK_ENERGY: f64 = 0.95;
/// Relative floor applied to the training RSS in the BIC criterion.
const RSS_FLOOR: f64 = 1e-10;

/// How the signal rank is chosen from the lag-covariance spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RankSelection {
    /// Rank minimising BIC over the one-step training error.
    #[default]
    Exact,
    /// Smallest rank capturing 95% of the eigen-energy.
    Fast,
    /// A caller-chosen rank.
    Fixed(usize),
}

/// How the one-step prediction error is turned into a raw score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ErrorFunction {
    #[default]
    SignedDifference,
    AbsoluteDifference,
    SignedProportion,
    AbsoluteProportion,
    SquaredDifference,
}

impl ErrorFunction {
    /// Score `actual` against `predicted`. Proportions with a zero prediction
    /// score 0.
    pub fn apply(self, actual: f64, predicted: f64) -> f64 {
        let diff = actual - predicted;
        match self {
            ErrorFunction::SignedDifference => diff,
            ErrorFunction::AbsoluteDifference => diff.abs(),
            ErrorFunction::SignedProportion if predicted == 0.0 => 0.0,
            ErrorFunction::SignedProportion => diff / predicted,
            ErrorFunction::AbsoluteProportion if predicted == 0.0 => 0.0,
            ErrorFunction::AbsoluteProportion => (diff / predicted).abs(),
            ErrorFunction::SquaredDifference => diff * diff,
        }
    }
}

/// Configuration for [`SeasonalDecomposer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SsaConfig {
    /// Embedding window `W`.
    pub window_size: usize,
    /// Length `L` of the trailing buffer used for adaptive re-estimation.
    pub series_length: usize,
    /// Number of leading points `Tn` used for training.
    pub train_size: usize,
    /// Default forecast horizon.
    pub horizon: usize,
    /// Re-estimate the basis as new points arrive.
    pub adaptive: bool,
    /// Confidence level of forecast bounds, in `[0, 1)`.
    pub confidence: f64,
    pub rank_selection: RankSelection,
    /// Upper bound on the signal rank (default `W - 1`).
    pub max_rank: Option<usize>,
    /// Pull explosive recurrence roots onto the unit circle.
    pub stabilize: bool,
}

impl Default for SsaConfig {
    fn default() -> Self {
        Self {
            window_size: 8,
            series_length: 30,
            train_size: 52,
            horizon: 4,
            adaptive: false,
            confidence: 0.95,
            rank_selection: RankSelection::Exact,
            max_rank: None,
            stabilize: true,
        }
    }
}

impl SsaConfig {
    /// Create a config with the given window, series length and training size.
    pub fn new(window_size: usize, series_length: usize, train_size: usize) -> Self {
        Self {
            window_size,
            series_length,
            train_size,
            ..Default::default()
        }
    }

    pub fn window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    pub fn series_length(mut self, series_length: usize) -> Self {
        self.series_length = series_length;
        self
    }

    pub fn train_size(mut self, train_size: usize) -> Self {
        self.train_size = train_size;
        self
    }

    pub fn horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn adaptive(mut self, adaptive: bool) -> Self {
        self.adaptive = adaptive;
        self
    }

    pub fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn rank_selection(mut self, rank_selection: RankSelection) -> Self {
        self.rank_selection = rank_selection;
        self
    }

    pub fn max_rank(mut self, max_rank: usize) -> Self {
        self.max_rank = Some(max_rank);
        self
    }

    pub fn stabilize(mut self, stabilize: bool) -> Self {
        self.stabilize = stabilize;
        self
    }

    /// Check every constraint; called by all SSA entry points before fitting.
    pub fn validate(&self) -> Result<()> {
        let w = self.window_size;
        if w < 2 {
            return Err(SignalError::config(
                "window_size",
                format!("must be at least 2, got {w}"),
            ));
        }
        if self.series_length <= w {
            return Err(SignalError::config(
                "series_length",
                format!(
                    "must exceed window_size ({w}), got {}",
                    self.series_length
                ),
            ));
        }
        if self.train_size <= 2 * w {
            return Err(SignalError::config(
                "train_size",
                format!(
                    "must exceed twice the window_size ({}), got {}",
                    2 * w,
                    self.train_size
                ),
            ));
        }
        if self.horizon == 0 {
            return Err(SignalError::config("horizon", "must be at least 1"));
        }
        if !(0.0..1.0).contains(&self.confidence) {
            return Err(SignalError::config(
                "confidence",
                format!("must be in [0, 1), got {}", self.confidence),
            ));
        }
        if self.rank_selection == RankSelection::Fixed(0) {
            return Err(SignalError::config("rank_selection", "fixed rank must be at least 1"));
        }
        if self.max_rank == Some(0) {
            return Err(SignalError::config("max_rank", "must be at least 1"));
        }
        Ok(())
    }

    fn rank_cap(&self) -> usize {
        let full = self.window_size - 1;
        self.max_rank.unwrap_or(full).clamp(1, full)
    }
}

/// Fits SSA decompositions with a fixed configuration.
#[derive(Debug, Clone)]
pub struct SeasonalDecomposer {
    config: SsaConfig,
}

impl SeasonalDecomposer {
    /// Validate `config` and build a decomposer.
    pub fn new(config: SsaConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SsaConfig {
        &self.config
    }

    /// Decompose `values` (non-finite entries are missing observations).
    ///
    /// Trains on the first `min(len, train_size)` points and then runs the
    /// recurrence over the whole series, producing one-step predictions and
    /// residuals for every index from `W - 1` on.
    pub fn decompose(&self, values: &[f64]) -> Result<Decomposition> {
        let cfg = &self.config;
        let w = cfg.window_size;
        let train_len = values.len().min(cfg.train_size);
        if train_len <= 2 * w {
            return Err(SignalError::InsufficientData {
                needed: 2 * w + 1,
                got: train_len,
            });
        }
        if values.len() < cfg.train_size {
            log::warn!(
                "series has {} points, fewer than train_size {}; training on all of them",
                values.len(),
                cfg.train_size
            );
        }

        let training = forward_fill(&values[..train_len]);
        let eigen = trajectory_eigen(&training, w);
        let (rank, mut recurrence) = self.select_rank(&eigen, &training);
        log::debug!("SSA window {w}: selected rank {rank}");

        let (_, train_residuals) = one_step(&training, &recurrence);
        let finite: Vec<f64> = train_residuals
            .iter()
            .copied()
            .filter(|r| r.is_finite())
            .collect();
        let sigma = if finite.is_empty() {
            0.0
        } else {
            (finite.iter().map(|r| r * r).sum::<f64>() / finite.len() as f64).sqrt()
        };

        // Sequential pass over the full series with imputation.
        let order = recurrence.order();
        let refit_len = cfg.series_length;
        let can_refit = cfg.adaptive && rank > 0 && refit_len >= 2 * w;
        let mut filled: Vec<f64> = Vec::with_capacity(values.len());
        let mut predictions = Vec::with_capacity(values.len());
        let mut residuals = Vec::with_capacity(values.len());
        let mut last_finite = training.first().copied().unwrap_or(0.0);

        for (t, &x) in values.iter().enumerate() {
            let prediction = if t >= order {
                recurrence.predict(&filled[t - order..t])
            } else {
                f64::NAN
            };
            predictions.push(prediction);

            if x.is_finite() {
                residuals.push(if prediction.is_finite() {
                    x - prediction
                } else {
                    f64::NAN
                });
                filled.push(x);
                last_finite = x;
            } else {
                residuals.push(f64::NAN);
                filled.push(if prediction.is_finite() {
                    prediction
                } else {
                    last_finite
                });
            }

            let seen = t + 1;
            if can_refit && seen > train_len && (seen - train_len) % w == 0 && seen >= refit_len {
                let recent = &filled[seen - refit_len..];
                let basis = trajectory_eigen(recent, w);
                if let Some(mut refit) = LinearRecurrence::from_basis(&basis.vectors, rank) {
                    if cfg.stabilize {
                        refit.stabilize();
                    }
                    recurrence = refit;
                }
            }
        }

        let state = filled[filled.len().saturating_sub(order)..].to_vec();
        Ok(Decomposition {
            predictions,
            residuals,
            model: SsaModel {
                config: cfg.clone(),
                rank,
                recurrence,
                sigma,
                state,
                observed: values.len(),
            },
        })
    }

    fn select_rank(&self, eigen: &SymmetricEigen, training: &[f64]) -> (usize, LinearRecurrence) {
        let cfg = &self.config;
        let cap = cfg.rank_cap();
        let build = |rank: usize| {
            LinearRecurrence::from_basis(&eigen.vectors, rank).map(|mut lrf| {
                if cfg.stabilize {
                    lrf.stabilize();
                }
                lrf
            })
        };

        let chosen = match cfg.rank_selection {
            RankSelection::Fixed(r) => {
                let r = r.clamp(1, cap);
                build(r).map(|lrf| (r, lrf))
            }
            RankSelection::Fast => {
                let r = energy_rank(&eigen.values, FAST_RANK_ENERGY).clamp(1, cap);
                build(r).map(|lrf| (r, lrf))
            }
            RankSelection::Exact => {
                let energy: f64 = training.iter().map(|x| x * x).sum();
                let floor = (RSS_FLOOR * energy).max(f64::MIN_POSITIVE);
                let mut best: Option<(f64, usize, LinearRecurrence)> = None;
                for r in 1..=cap {
                    let Some(lrf) = build(r) else { continue };
                    let (_, residuals) = one_step(training, &lrf);
                    let scored: Vec<f64> =
                        residuals.iter().copied().filter(|e| e.is_finite()).collect();
                    if scored.is_empty() {
                        continue;
                    }
                    let n = scored.len() as f64;
                    let rss = scored.iter().map(|e| e * e).sum::<f64>().max(floor);
                    let bic = n * (rss / n).ln() + r as f64 * n.ln();
                    if best.as_ref().map_or(true, |(b, _, _)| bic < *b) {
                        best = Some((bic, r, lrf));
                    }
                }
                best.map(|(_, r, lrf)| (r, lrf))
            }
        };

        chosen.unwrap_or_else(|| {
            log::warn!("no admissible SSA signal subspace; falling back to persistence");
            (0, LinearRecurrence::persistence(cfg.window_size - 1))
        })
    }
}

/// One-step predictions and residuals of a recurrence over finite values.
fn one_step(values: &[f64], recurrence: &LinearRecurrence) -> (Vec<f64>, Vec<f64>) {
    let order = recurrence.order();
    let mut predictions = vec![f64::NAN; values.len()];
    let mut residuals = vec![f64::NAN; values.len()];
    for t in order..values.len() {
        let p = recurrence.predict(&values[t - order..t]);
        predictions[t] = p;
        residuals[t] = values[t] - p;
    }
    (predictions, residuals)
}

/// Eigen-decomposition of the `W × W` lag covariance of the trajectory matrix.
fn trajectory_eigen(values: &[f64], window: usize) -> SymmetricEigen {
    let k = values.len() + 1 - window;
    let mut cov = vec![vec![0.0; window]; window];
    for i in 0..window {
        for j in i..window {
            let sum: f64 = (0..k).map(|c| values[c + i] * values[c + j]).sum();
            cov[i][j] = sum / k as f64;
            cov[j][i] = cov[i][j];
        }
    }
    symmetric_eigen(&cov)
}

fn energy_rank(eigenvalues: &[f64], share: f64) -> usize {
    let total: f64 = eigenvalues.iter().map(|v| v.max(0.0)).sum();
    if total <= 0.0 {
        return 1;
    }
    let mut acc = 0.0;
    for (i, v) in eigenvalues.iter().enumerate() {
        acc += v.max(0.0);
        if acc >= share * total {
            return i + 1;
        }
    }
    eigenvalues.len()
}

/// Output of [`SeasonalDecomposer::decompose`].
#[derive(Debug, Clone)]
pub struct Decomposition {
    /// One-step predictions; `NaN` before index `W - 1`.
    pub predictions: Vec<f64>,
    /// `actual - prediction`; `NaN` where either side is missing.
    pub residuals: Vec<f64>,
    model: SsaModel,
}

impl Decomposition {
    /// Raw scores under `error_function`; `NaN` where no score exists.
    pub fn scores(&self, values: &[f64], error_function: ErrorFunction) -> Vec<f64> {
        values
            .iter()
            .zip(&self.predictions)
            .map(|(&actual, &predicted)| {
                if actual.is_finite() && predicted.is_finite() {
                    error_function.apply(actual, predicted)
                } else {
                    f64::NAN
                }
            })
            .collect()
    }

    pub fn model(&self) -> &SsaModel {
        &self.model
    }

    pub fn into_model(self) -> SsaModel {
        self.model
    }
}

/// Fitted SSA parameters. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct SsaModel {
    config: SsaConfig,
    rank: usize,
    recurrence: LinearRecurrence,
    sigma: f64,
    state: Vec<f64>,
    observed: usize,
}

impl SsaModel {
    pub fn config(&self) -> &SsaConfig {
        &self.config
    }

    /// Selected signal rank (0 when the persistence fallback was used).
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn recurrence(&self) -> &LinearRecurrence {
        &self.recurrence
    }

    /// RMS one-step training residual.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Number of observations the model has consumed.
    pub fn observed(&self) -> usize {
        self.observed
    }

    /// Forecast `horizon` steps past the last observation.
    ///
    /// Bounds are `±z_{(1+c)/2} · σ · sqrt(Σ_{k<h} ψ_k²)` with `ψ` the impulse
    /// response of the recurrence.
    pub fn forecast(&self, horizon: usize) -> Forecast {
        let point = self.recurrence.extend(&self.state, horizon);
        let z = quantile_normal((1.0 + self.config.confidence) / 2.0);
        let psi = self.recurrence.impulse_response(horizon);

        let mut acc = 0.0;
        let half_widths: Vec<f64> = psi
            .iter()
            .map(|p| {
                acc += p * p;
                let width = z * self.sigma * acc.sqrt();
                if width.is_finite() {
                    width
                } else {
                    f64::MAX
                }
            })
            .collect();

        let lower = point.iter().zip(&half_widths).map(|(p, h)| p - h).collect();
        let upper = point.iter().zip(&half_widths).map(|(p, h)| p + h).collect();
        Forecast::from_values_with_intervals(point, lower, upper)
            .unwrap_or_else(|_| Forecast::new())
    }

    /// Forecast over the configured default horizon.
    pub fn forecast_default(&self) -> Forecast {
        self.forecast(self.config.horizon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn seasonal(n: usize, period: f64) -> Vec<f64> {
        (0..n)
            .map(|t| 10.0 + 3.0 * (2.0 * PI * t as f64 / period).sin())
            .collect()
    }

    #[test]
    fn validate_rejects_small_training_size() {
        let err = SsaConfig::new(8, 20, 16).validate().unwrap_err();
        assert_eq!(err.parameter(), Some("train_size"));
        assert!(SsaConfig::new(8, 20, 17).validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_parameters() {
        let cases = [
            (SsaConfig::new(1, 20, 40), "window_size"),
            (SsaConfig::new(8, 8, 40), "series_length"),
            (SsaConfig::default().horizon(0), "horizon"),
            (SsaConfig::default().confidence(1.0), "confidence"),
            (SsaConfig::default().confidence(-0.1), "confidence"),
            (
                SsaConfig::default().rank_selection(RankSelection::Fixed(0)),
                "rank_selection",
            ),
            (SsaConfig::default().max_rank(0), "max_rank"),
        ];
        for (config, parameter) in cases {
            assert_eq!(config.validate().unwrap_err().parameter(), Some(parameter));
        }
    }

    #[test]
    fn decomposer_refuses_invalid_config_before_fitting() {
        assert!(SeasonalDecomposer::new(SsaConfig::new(10, 30, 20)).is_err());
    }

    #[test]
    fn decompose_reports_insufficient_data() {
        let decomposer = SeasonalDecomposer::new(SsaConfig::new(4, 10, 40)).unwrap();
        let err = decomposer.decompose(&[1.0; 8]).unwrap_err();
        assert_eq!(err, SignalError::InsufficientData { needed: 9, got: 8 });
    }

    #[test]
    fn residuals_are_nan_before_window() {
        let values = seasonal(60, 6.0);
        let decomposer = SeasonalDecomposer::new(SsaConfig::new(6, 20, 40)).unwrap();
        let d = decomposer.decompose(&values).unwrap();
        assert_eq!(d.residuals.len(), 60);
        assert!(d.residuals[..5].iter().all(|r| r.is_nan()));
        assert!(d.residuals[5..].iter().all(|r| r.is_finite()));
    }

    #[test]
    fn pure_sinusoid_is_predicted_exactly() {
        let values = seasonal(80, 8.0);
        let decomposer = SeasonalDecomposer::new(SsaConfig::new(10, 30, 60)).unwrap();
        let d = decomposer.decompose(&values).unwrap();
        assert_eq!(d.model().rank(), 3);
        for r in &d.residuals[9..] {
            assert!(r.abs() < 1e-6, "residual {r}");
        }
    }

    #[test]
    fn forecast_continues_sinusoid() {
        let values = seasonal(64, 8.0);
        let config = SsaConfig::new(10, 30, 64).confidence(0.9);
        let model = SeasonalDecomposer::new(config)
            .unwrap()
            .decompose(&values)
            .unwrap()
            .into_model();
        let forecast = model.forecast(8);
        let expected = seasonal(72, 8.0);
        assert_eq!(forecast.horizon(), 8);
        for (h, p) in forecast.point().iter().enumerate() {
            assert_relative_eq!(*p, expected[64 + h], epsilon = 1e-5);
        }
    }

    #[test]
    fn forecast_bounds_widen_with_horizon_and_confidence() {
        let values: Vec<f64> = (0..60)
            .map(|t| 5.0 + (t as f64 * 0.9).sin() + 0.3 * ((t * 7 % 11) as f64 - 5.0) / 5.0)
            .collect();
        let fit = |c: f64| {
            SeasonalDecomposer::new(SsaConfig::new(6, 20, 60).confidence(c))
                .unwrap()
                .decompose(&values)
                .unwrap()
                .into_model()
                .forecast(6)
        };
        let narrow = fit(0.8);
        let wide = fit(0.95);

        let width = |f: &Forecast, h: usize| f.upper().unwrap()[h] - f.lower().unwrap()[h];
        for h in 1..6 {
            assert!(width(&wide, h) >= width(&wide, h - 1));
        }
        for h in 0..6 {
            assert!(width(&wide, h) >= width(&narrow, h));
        }
    }

    #[test]
    fn zero_confidence_gives_degenerate_bounds() {
        let values = seasonal(40, 5.0);
        let model = SeasonalDecomposer::new(SsaConfig::new(5, 20, 40).confidence(0.0))
            .unwrap()
            .decompose(&values)
            .unwrap()
            .into_model();
        let forecast = model.forecast(3);
        for (lo, p) in forecast.lower().unwrap().iter().zip(forecast.point()) {
            assert_relative_eq!(*lo, *p, epsilon = 1e-9);
        }
    }

    #[test]
    fn missing_values_are_imputed() {
        let mut values = seasonal(60, 6.0);
        values[45] = f64::NAN;
        let d = SeasonalDecomposer::new(SsaConfig::new(6, 20, 40))
            .unwrap()
            .decompose(&values)
            .unwrap();
        assert!(d.residuals[45].is_nan());
        assert!(d.predictions[46].is_finite());
        assert!(d.residuals[46].abs() < 1e-6);
    }

    #[test]
    fn decomposition_is_deterministic() {
        let values: Vec<f64> = (0..50).map(|t| ((t * 37 % 17) as f64).sqrt()).collect();
        let run = || {
            SeasonalDecomposer::new(SsaConfig::new(5, 20, 50))
                .unwrap()
                .decompose(&values)
                .unwrap()
        };
        assert_eq!(run().model(), run().model());
    }

    #[test]
    fn rank_selection_strategies() {
        let values = seasonal(60, 8.0);
        let rank = |selection| {
            SeasonalDecomposer::new(SsaConfig::new(10, 30, 60).rank_selection(selection))
                .unwrap()
                .decompose(&values)
                .unwrap()
                .model()
                .rank()
        };
        assert_eq!(rank(RankSelection::Fixed(2)), 2);
        assert!(rank(RankSelection::Fast) <= 3);

        let capped = SeasonalDecomposer::new(
            SsaConfig::new(10, 30, 60)
                .rank_selection(RankSelection::Fixed(50))
                .max_rank(4),
        )
        .unwrap()
        .decompose(&values)
        .unwrap();
        assert_eq!(capped.model().rank(), 4);
    }

    #[test]
    fn adaptive_mode_tracks_new_regime() {
        let mut values = seasonal(40, 5.0);
        values.extend((40..120).map(|t| 10.0 + 3.0 * (2.0 * PI * t as f64 / 9.0).sin()));
        let run = |adaptive| {
            SeasonalDecomposer::new(
                SsaConfig::new(10, 30, 40)
                    .adaptive(adaptive)
                    .rank_selection(RankSelection::Fixed(3)),
            )
            .unwrap()
            .decompose(&values)
            .unwrap()
        };
        let tail_error = |d: &Decomposition| -> f64 {
            d.residuals[100..].iter().map(|r| r.abs()).sum()
        };
        assert!(tail_error(&run(true)) < tail_error(&run(false)));
    }

    #[test]
    fn error_functions() {
        assert_eq!(ErrorFunction::SignedDifference.apply(3.0, 5.0), -2.0);
        assert_eq!(ErrorFunction::AbsoluteDifference.apply(3.0, 5.0), 2.0);
        assert_eq!(ErrorFunction::SignedProportion.apply(3.0, 4.0), -0.25);
        assert_eq!(ErrorFunction::AbsoluteProportion.apply(3.0, 4.0), 0.25);
        assert_eq!(ErrorFunction::SignedProportion.apply(3.0, 0.0), 0.0);
        assert_eq!(ErrorFunction::SquaredDifference.apply(3.0, 5.0), 4.0);
    }
}
