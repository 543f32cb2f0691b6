//! Betting martingales that accumulate evidence of a distribution change.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Betting function applied to each p-value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MartingaleType {
    /// No martingale; alerts fall back to the plain p-value test.
    None,
    /// `ε · p^(ε-1)`.
    #[default]
    Power,
    /// Power martingale integrated over `ε ∈ (0, 1)`.
    Mixture,
}

impl MartingaleType {
    /// Log of the betting factor for `p` (already floored away from 0).
    pub fn log_factor(self, p: f64, eps: f64) -> f64 {
        match self {
            MartingaleType::None => 0.0,
            MartingaleType::Power => eps.ln() + (eps - 1.0) * p.ln(),
            MartingaleType::Mixture => {
                let lp = p.ln();
                if lp.abs() < 1e-12 {
                    return 0.5_f64.ln();
                }
                ((p * lp - p + 1.0) / (p * lp * lp)).ln()
            }
        }
    }
}

/// Sliding log-martingale over the last `history_length` betting updates.
///
/// The live value is the largest sum over a suffix of the window, never
/// below zero.
#[derive(Debug, Clone)]
pub struct MartingaleScorer {
    kind: MartingaleType,
    eps: f64,
    p_value_floor: f64,
    history_length: usize,
    alpha: f64,
    log_threshold: f64,
    updates: VecDeque<f64>,
}

impl MartingaleScorer {
    /// `confidence_pct` in (0, 100) sets the alert level
    /// `ln(1 / (1 - confidence / 100))`.
    pub fn new(
        kind: MartingaleType,
        eps: f64,
        p_value_floor: f64,
        history_length: usize,
        confidence_pct: f64,
    ) -> Self {
        let alpha = 1.0 - confidence_pct / 100.0;
        Self {
            kind,
            eps,
            p_value_floor,
            history_length,
            alpha,
            log_threshold: -alpha.ln(),
            updates: VecDeque::with_capacity(history_length),
        }
    }

    /// Feed one p-value. Returns whether an alert fired and the martingale
    /// value after the update.
    pub fn update(&mut self, p_value: f64) -> (bool, f64) {
        let p = if p_value.is_finite() {
            p_value.clamp(self.p_value_floor, 1.0)
        } else {
            1.0
        };
        if self.kind == MartingaleType::None {
            return (p_value < self.alpha, 1.0);
        }

        if self.updates.len() == self.history_length {
            self.updates.pop_front();
        }
        self.updates.push_back(self.kind.log_factor(p, self.eps));

        let log_value = self.live_log_value();
        let alert = log_value >= self.log_threshold;
        if alert {
            self.updates.clear();
        }
        (alert, log_value.exp())
    }

    /// Current log-martingale without feeding a new value.
    pub fn live_log_value(&self) -> f64 {
        let mut best = 0.0_f64;
        let mut suffix = 0.0;
        for &u in self.updates.iter().rev() {
            suffix += u;
            best = best.max(suffix);
        }
        best
    }

    pub fn log_threshold(&self) -> f64 {
        self.log_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn power_factor_matches_formula() {
        let lf = MartingaleType::Power.log_factor(0.01, 0.1);
        assert_relative_eq!(lf.exp(), 0.1 * 0.01_f64.powf(-0.9), epsilon = 1e-9);
    }

    #[test]
    fn mixture_factor_limits_to_one_half() {
        assert_relative_eq!(MartingaleType::Mixture.log_factor(1.0, 0.1).exp(), 0.5);
        let near = MartingaleType::Mixture.log_factor(0.999, 0.1).exp();
        assert_relative_eq!(near, 0.5, epsilon = 1e-3);
        assert!(MartingaleType::Mixture.log_factor(0.001, 0.1) > 0.0);
    }

    #[test]
    fn extreme_p_value_alerts_and_resets() {
        let mut scorer = MartingaleScorer::new(MartingaleType::Power, 0.1, 1e-3, 20, 95.0);
        assert_relative_eq!(scorer.log_threshold(), 20.0_f64.ln(), epsilon = 1e-12);

        let (alert, value) = scorer.update(0.0);
        assert!(alert);
        assert!(value >= 20.0);
        assert_eq!(scorer.live_log_value(), 0.0);
    }

    #[test]
    fn unremarkable_p_values_never_alert() {
        let mut scorer = MartingaleScorer::new(MartingaleType::Power, 0.1, 1e-3, 20, 95.0);
        for i in 0..200 {
            let p = 0.2 + 0.6 * ((i * 7 % 10) as f64) / 10.0;
            let (alert, value) = scorer.update(p);
            assert!(!alert);
            assert_eq!(value, 1.0);
        }
    }

    #[test]
    fn history_length_bounds_accumulation() {
        // Each update contributes ln(0.1) - 0.9 ln(0.05) ≈ 0.39.
        let mut short = MartingaleScorer::new(MartingaleType::Power, 0.1, 1e-3, 2, 95.0);
        let mut long = MartingaleScorer::new(MartingaleType::Power, 0.1, 1e-3, 20, 95.0);
        let mut short_alerts = 0;
        let mut long_alerts = 0;
        for _ in 0..10 {
            short_alerts += usize::from(short.update(0.05).0);
            long_alerts += usize::from(long.update(0.05).0);
        }
        assert_eq!(short_alerts, 0);
        assert!(long_alerts >= 1);
    }

    #[test]
    fn none_type_uses_p_value_threshold() {
        let mut scorer = MartingaleScorer::new(MartingaleType::None, 0.1, 1e-3, 20, 95.0);
        assert!(scorer.update(0.01).0);
        assert!(!scorer.update(0.2).0);
    }
}
