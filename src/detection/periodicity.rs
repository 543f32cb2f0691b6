//! Seasonal period detection.
//!
//! Hybrid frequency/time-domain search in the spirit of Autoperiod
//! (Vlachos et al. 2005):
//! 1. The series is linearly detrended so a ramp does not masquerade as a
//!    long period.
//! 2. Periodogram peaks give candidate periods ("hints").
//! 3. Each hint is validated on the autocorrelation function and refined
//!    by hill climbing to the nearest ACF local maximum.
//! 4. Without any validated hint, ACF local maxima are scanned directly.
//! 5. Multiples of an accepted period are dropped as harmonics.

use super::fft::periodogram_peaks;
use crate::utils::ols::line_fit;
use crate::utils::stats::{acf, population_variance};
use serde::{Deserialize, Serialize};

/// How the seasonal period is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PeriodSetting {
    /// Detect the period from the data.
    #[default]
    Auto,
    /// Use this period; values below 2 mean "no seasonality".
    Fixed(usize),
}

impl PeriodSetting {
    /// Resolve to a usable period, `None` when there is no seasonality.
    pub fn resolve(self, values: &[f64], config: &PeriodicityConfig) -> Option<usize> {
        match self {
            PeriodSetting::Fixed(p) if p >= 2 => Some(p),
            PeriodSetting::Fixed(_) => None,
            PeriodSetting::Auto => detect_period(values, config),
        }
    }
}

/// Tuning for [`detect_period`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeriodicityConfig {
    /// Smallest admissible period.
    pub min_period: usize,
    /// Largest admissible period; defaults to half the series length.
    pub max_period: Option<usize>,
    /// Periodogram peaks must exceed this multiple of the median power.
    pub power_threshold: f64,
    /// Minimum autocorrelation for a period to be accepted.
    pub acf_threshold: f64,
}

impl Default for PeriodicityConfig {
    fn default() -> Self {
        Self {
            min_period: 2,
            max_period: None,
            power_threshold: 3.0,
            acf_threshold: 0.3,
        }
    }
}

impl PeriodicityConfig {
    pub fn min_period(mut self, min: usize) -> Self {
        self.min_period = min;
        self
    }

    pub fn max_period(mut self, max: usize) -> Self {
        self.max_period = Some(max);
        self
    }

    pub fn power_threshold(mut self, threshold: f64) -> Self {
        self.power_threshold = threshold;
        self
    }

    pub fn acf_threshold(mut self, threshold: f64) -> Self {
        self.acf_threshold = threshold;
        self
    }

    fn bounds(&self, n: usize) -> (usize, usize) {
        let min = self.min_period.max(2);
        let max = self.max_period.unwrap_or(n / 2).min(n / 2);
        (min, max)
    }
}

/// A candidate period with its autocorrelation score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectedPeriod {
    pub period: usize,
    pub score: f64,
}

/// All accepted periods, best first (score descending, then period ascending).
pub fn detect_periods(values: &[f64], config: &PeriodicityConfig) -> Vec<DetectedPeriod> {
    let n = values.len();
    let (min_period, max_period) = config.bounds(n);
    if n < 4 || min_period > max_period || values.iter().any(|v| !v.is_finite()) {
        return Vec::new();
    }

    let detrended = match detrend(values) {
        Some(d) => d,
        None => return Vec::new(),
    };
    let correlations = acf(&detrended, (max_period + 1).min(n - 1));

    let hints = periodogram_peaks(&detrended, config.power_threshold, min_period, max_period);
    let mut candidates: Vec<(usize, f64)> = hints
        .into_iter()
        .filter_map(|(hint, _)| {
            hill_climb(&correlations, hint, min_period, max_period)
                .filter(|(_, score)| *score >= config.acf_threshold)
        })
        .collect();

    if candidates.is_empty() {
        candidates = acf_peaks(&correlations, min_period, max_period, config.acf_threshold);
    }

    candidates.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    candidates.dedup_by_key(|c| c.0);

    filter_harmonics(candidates)
        .into_iter()
        .map(|(period, score)| DetectedPeriod {
            period,
            score: score.clamp(0.0, 1.0),
        })
        .collect()
}

/// The dominant period, or `None` when no seasonality is found.
pub fn detect_period(values: &[f64], config: &PeriodicityConfig) -> Option<usize> {
    let period = detect_periods(values, config).first().map(|p| p.period);
    match period {
        Some(p) => log::debug!("detected seasonal period {p}"),
        None => log::debug!("no seasonal period detected over {} points", values.len()),
    }
    period
}

/// Public period value: `0` stands for "no seasonality".
pub fn period_or_zero(period: Option<usize>) -> usize {
    period.unwrap_or(0)
}

/// Residuals of a straight-line fit, `None` when nothing but the trend is left.
fn detrend(values: &[f64]) -> Option<Vec<f64>> {
    let x: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
    let fit = line_fit(&x, values).ok()?;
    let residuals: Vec<f64> = x
        .iter()
        .zip(values)
        .map(|(xi, v)| v - fit.predict_one(&[*xi]))
        .collect();

    let scale = population_variance(values);
    if population_variance(&residuals) <= 1e-10 * (1.0 + scale) {
        return None;
    }
    Some(residuals)
}

/// Move from `start` to the nearest strict ACF local maximum.
fn hill_climb(
    correlations: &[f64],
    start: usize,
    min_period: usize,
    max_period: usize,
) -> Option<(usize, f64)> {
    let at = |lag: usize| correlations.get(lag).copied().unwrap_or(f64::NEG_INFINITY);
    let mut current = start.clamp(min_period, max_period);

    for _ in 0..max_period {
        let left = if current > min_period { at(current - 1) } else { f64::NEG_INFINITY };
        let right = if current < max_period { at(current + 1) } else { f64::NEG_INFINITY };
        let here = at(current);

        if left > here && left >= right {
            current -= 1;
        } else if right > here {
            current += 1;
        } else {
            break;
        }
    }

    // The last computed lag has no right neighbour and cannot be a peak.
    if current + 1 >= correlations.len() {
        return None;
    }
    let here = at(current);
    if here > at(current - 1) && here > at(current + 1) {
        Some((current, here))
    } else {
        None
    }
}

fn acf_peaks(
    correlations: &[f64],
    min_period: usize,
    max_period: usize,
    threshold: f64,
) -> Vec<(usize, f64)> {
    (min_period..=max_period)
        .filter(|&lag| lag + 1 < correlations.len())
        .filter_map(|lag| {
            let (prev, curr, next) = (correlations[lag - 1], correlations[lag], correlations[lag + 1]);
            (curr > prev && curr > next && curr >= threshold).then_some((lag, curr))
        })
        .collect()
}

/// Drop periods that are (near) integer multiples of an earlier period.
fn filter_harmonics(peaks: Vec<(usize, f64)>) -> Vec<(usize, f64)> {
    let mut kept: Vec<(usize, f64)> = Vec::new();
    for (period, score) in peaks {
        let is_harmonic = kept.iter().any(|&(base, _)| {
            let ratio = period as f64 / base as f64;
            let rounded = ratio.round();
            rounded > 1.0 && (ratio - rounded).abs() < 0.1
        });
        let is_duplicate = kept.iter().any(|&(p, _)| p.abs_diff(period) <= 1);
        if !is_harmonic && !is_duplicate {
            kept.push((period, score));
        }
    }
    kept
}
