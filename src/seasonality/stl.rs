//! STL (Seasonal-Trend decomposition using LOESS).
//!
//! Splits a batch into trend, seasonal and remainder components. Robust
//! fitting is on by default so isolated anomalies do not leak into the
//! seasonal estimate.

use crate::utils::stats::{median, variance};

/// Components of an STL decomposition.
#[derive(Debug, Clone)]
pub struct StlComponents {
    pub trend: Vec<f64>,
    pub seasonal: Vec<f64>,
    pub remainder: Vec<f64>,
}

impl StlComponents {
    /// Seasonal strength in [0, 1]; values close to 1 indicate strong seasonality.
    pub fn seasonal_strength(&self) -> f64 {
        let seasonal_plus_remainder: Vec<f64> = self
            .seasonal
            .iter()
            .zip(&self.remainder)
            .map(|(s, r)| s + r)
            .collect();
        let var_sr = variance(&seasonal_plus_remainder);
        if var_sr < 1e-10 {
            return 0.0;
        }
        (1.0 - variance(&self.remainder) / var_sr).max(0.0)
    }
}

/// STL configuration following Cleveland et al. (1990).
#[derive(Debug, Clone)]
pub struct Stl {
    period: usize,
    seasonal_span: usize,
    trend_span: usize,
    low_pass_span: usize,
    inner_iterations: usize,
    outer_iterations: usize,
}

impl Stl {
    pub fn new(period: usize) -> Self {
        let period = period.max(2);
        let ns = period | 1;
        let nt = (1.5 * period as f64 / (1.0 - 1.5 / ns as f64)).ceil() as usize;
        Self {
            period,
            seasonal_span: ns,
            trend_span: nt | 1,
            low_pass_span: period | 1,
            inner_iterations: 2,
            outer_iterations: 3,
        }
    }

    /// Zero disables the robustness pass.
    pub fn outer_iterations(mut self, n: usize) -> Self {
        self.outer_iterations = n;
        self
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Decompose `series`; `None` when it is shorter than two periods.
    pub fn decompose(&self, series: &[f64]) -> Option<StlComponents> {
        let n = series.len();
        if n < 2 * self.period {
            return None;
        }

        let mut seasonal = vec![0.0; n];
        let mut trend = vec![0.0; n];
        let mut weights = vec![1.0; n];

        for outer in 0..=self.outer_iterations {
            for _ in 0..self.inner_iterations {
                let detrended: Vec<f64> = series.iter().zip(&trend).map(|(y, t)| y - t).collect();
                let cycle = self.smooth_cycle_subseries(&detrended, &weights);
                let low = self.low_pass_filter(&cycle);
                for i in 0..n {
                    seasonal[i] = cycle[i] - low[i];
                }

                let deseasonalized: Vec<f64> =
                    series.iter().zip(&seasonal).map(|(y, s)| y - s).collect();
                trend = tricube_smooth(&deseasonalized, self.trend_span, &weights);
            }

            if outer < self.outer_iterations {
                weights = robustness_weights(&remainder(series, &seasonal, &trend));
            }
        }

        let remainder = remainder(series, &seasonal, &trend);
        Some(StlComponents {
            trend,
            seasonal,
            remainder,
        })
    }

    fn smooth_cycle_subseries(&self, detrended: &[f64], weights: &[f64]) -> Vec<f64> {
        let mut result = vec![0.0; detrended.len()];
        for phase in 0..self.period {
            let indices: Vec<usize> = (phase..detrended.len()).step_by(self.period).collect();
            let values: Vec<f64> = indices.iter().map(|&i| detrended[i]).collect();
            let sub_weights: Vec<f64> = indices.iter().map(|&i| weights[i]).collect();
            let smoothed = tricube_smooth(&values, self.seasonal_span, &sub_weights);
            for (&i, s) in indices.iter().zip(smoothed) {
                result[i] = s;
            }
        }
        result
    }

    /// MA(period), MA(period), MA(3), then LOESS.
    fn low_pass_filter(&self, series: &[f64]) -> Vec<f64> {
        let ma = moving_average(&moving_average(&moving_average(series, self.period), self.period), 3);
        tricube_smooth(&ma, self.low_pass_span, &vec![1.0; series.len()])
    }
}

fn remainder(series: &[f64], seasonal: &[f64], trend: &[f64]) -> Vec<f64> {
    series
        .iter()
        .zip(seasonal)
        .zip(trend)
        .map(|((y, s), t)| y - s - t)
        .collect()
}

/// Centered moving average, shrinking at the edges.
fn moving_average(series: &[f64], window: usize) -> Vec<f64> {
    let n = series.len();
    let half = window / 2;
    (0..n)
        .map(|i| {
            let start = i.saturating_sub(half);
            let end = (i + half + 1).min(n);
            series[start..end].iter().sum::<f64>() / (end - start) as f64
        })
        .collect()
}

/// Tricube-weighted local mean over a window of `span` points.
fn tricube_smooth(values: &[f64], span: usize, weights: &[f64]) -> Vec<f64> {
    let n = values.len();
    let half = span / 2;
    let max_dist = half as f64 + 1.0;

    (0..n)
        .map(|i| {
            let start = i.saturating_sub(half);
            let end = (i + half + 1).min(n);
            let mut sum_w = 0.0;
            let mut sum_v = 0.0;
            for j in start..end {
                let u = i.abs_diff(j) as f64 / max_dist;
                let w = (1.0 - u.powi(3)).powi(3) * weights[j];
                sum_w += w;
                sum_v += w * values[j];
            }
            if sum_w > 0.0 {
                sum_v / sum_w
            } else {
                values[i]
            }
        })
        .collect()
}

/// Bisquare weights with cutoff `6 · median(|r|)`.
fn robustness_weights(remainder: &[f64]) -> Vec<f64> {
    let abs: Vec<f64> = remainder.iter().map(|r| r.abs()).collect();
    let h = 6.0 * median(&abs);
    if h < 1e-10 {
        return vec![1.0; remainder.len()];
    }
    abs.iter()
        .map(|a| {
            let u = a / h;
            if u < 1.0 {
                (1.0 - u * u).powi(2)
            } else {
                0.0
            }
        })
        .collect()
}
