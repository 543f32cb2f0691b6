//! Kernel-density p-values over a sliding history of raw scores.

use crate::utils::stats::{cdf_normal, mean};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Smallest kernel bandwidth.
const MIN_BANDWIDTH: f64 = 1e-6;

/// Which deviations count as evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AnomalySide {
    /// Only upward deviations.
    Positive,
    /// Only downward deviations.
    Negative,
    /// Deviations in either direction.
    #[default]
    TwoSided,
}

/// Sliding window of past raw scores used to rank the current one.
#[derive(Debug, Clone)]
pub struct PValueHistory {
    capacity: usize,
    side: AnomalySide,
    scores: VecDeque<f64>,
}

impl PValueHistory {
    pub fn new(capacity: usize, side: AnomalySide) -> Self {
        Self {
            capacity,
            side,
            scores: VecDeque::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// p-value of `raw` against the current history, without recording it.
    ///
    /// Non-finite scores and an empty history are neutral (p = 1).
    pub fn p_value(&self, raw: f64) -> f64 {
        if !raw.is_finite() || self.scores.is_empty() {
            return 1.0;
        }
        let f = self.kernel_cdf(raw);
        let p = match self.side {
            AnomalySide::Positive => 1.0 - f,
            AnomalySide::Negative => f,
            AnomalySide::TwoSided => 2.0 * f.min(1.0 - f),
        };
        if p.is_finite() {
            p.clamp(0.0, 1.0)
        } else {
            1.0
        }
    }

    /// Score `raw` and then record it. Non-finite scores are not recorded.
    pub fn score(&mut self, raw: f64) -> f64 {
        let p = self.p_value(raw);
        self.push(raw);
        p
    }

    /// Record a finite raw score, evicting the oldest when full.
    pub fn push(&mut self, raw: f64) {
        if !raw.is_finite() || self.capacity == 0 {
            return;
        }
        if self.scores.len() == self.capacity {
            self.scores.pop_front();
        }
        self.scores.push_back(raw);
    }

    pub fn clear(&mut self) {
        self.scores.clear();
    }

    /// Gaussian-kernel estimate of P(X <= x) from the history.
    fn kernel_cdf(&self, x: f64) -> f64 {
        let (front, back) = self.scores.as_slices();
        let all: Vec<f64> = front.iter().chain(back).copied().collect();
        let sigma = if all.len() == 1 {
            1.0
        } else {
            let m = mean(&all);
            (all.iter().map(|v| (v - m).powi(2)).sum::<f64>() / all.len() as f64).sqrt()
        };
        let bandwidth = (std::f64::consts::SQRT_2 * sigma).max(MIN_BANDWIDTH);
        all.iter()
            .map(|b| cdf_normal((x - b) / bandwidth))
            .sum::<f64>()
            / all.len() as f64
    }
}

/// p-value below which a confidence percentage raises an alert.
pub fn alert_threshold(confidence_pct: f64) -> f64 {
    1.0 - confidence_pct / 100.0
}
