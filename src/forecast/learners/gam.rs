//! Additive model over a binned feature, boosted one stump at a time.

use super::Regressor;
use crate::error::Result;
use crate::utils::stats::mean;

const MAX_BINS: usize = 255;

#[derive(Debug, Clone)]
pub struct GamRegressor {
    learning_rate: f64,
    iterations: usize,
    intercept: f64,
    /// Upper edges of all bins except the last.
    edges: Vec<f64>,
    shape: Vec<f64>,
}

impl Default for GamRegressor {
    fn default() -> Self {
        Self {
            learning_rate: 0.002,
            iterations: 9500,
            intercept: 0.0,
            edges: Vec::new(),
            shape: Vec::new(),
        }
    }
}

impl GamRegressor {
    pub fn learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn num_bins(&self) -> usize {
        self.shape.len()
    }

    fn bin(&self, x: f64) -> usize {
        self.edges.partition_point(|&e| e < x)
    }
}

/// Distinct values get their own bin when they fit; otherwise bins hold
/// roughly equal counts. Edges sit midway between neighbouring values.
fn bin_edges(x: &[f64]) -> Vec<f64> {
    let mut sorted = x.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mut distinct = sorted.clone();
    distinct.dedup();
    if distinct.len() <= MAX_BINS {
        return distinct.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect();
    }

    let n = sorted.len();
    let mut edges: Vec<f64> = Vec::with_capacity(MAX_BINS - 1);
    for k in 1..MAX_BINS {
        let cut = k * n / MAX_BINS;
        if cut == 0 || cut >= n || sorted[cut - 1] == sorted[cut] {
            continue;
        }
        let edge = 0.5 * (sorted[cut - 1] + sorted[cut]);
        if edges.last().map_or(true, |&last| edge > last) {
            edges.push(edge);
        }
    }
    edges
}

impl Regressor for GamRegressor {
    fn fit(&mut self, x: &[f64], y: &[f64]) -> Result<()> {
        self.intercept = mean(y);
        self.edges = bin_edges(x);
        let bins = self.edges.len() + 1;
        self.shape = vec![0.0; bins];
        if bins < 2 {
            return Ok(());
        }

        let index: Vec<usize> = x.iter().map(|&v| self.bin(v)).collect();
        let mut counts = vec![0.0; bins];
        for &b in &index {
            counts[b] += 1.0;
        }
        let total = x.len() as f64;
        let mut residual_sums = vec![0.0; bins];

        for _ in 0..self.iterations {
            residual_sums.iter_mut().for_each(|s| *s = 0.0);
            for (&b, &yi) in index.iter().zip(y) {
                residual_sums[b] += yi - self.intercept - self.shape[b];
            }
            let residual_total: f64 = residual_sums.iter().sum();

            // Best stump over bin boundaries by squared-error reduction.
            let mut best: Option<(usize, f64, f64, f64)> = None;
            let (mut left_sum, mut left_count) = (0.0, 0.0);
            for cut in 1..bins {
                left_sum += residual_sums[cut - 1];
                left_count += counts[cut - 1];
                let right_count = total - left_count;
                if left_count == 0.0 || right_count == 0.0 {
                    continue;
                }
                let right_sum = residual_total - left_sum;
                let gain = left_sum * left_sum / left_count + right_sum * right_sum / right_count;
                if best.map_or(true, |(_, g, _, _)| gain > g) {
                    best = Some((cut, gain, left_sum / left_count, right_sum / right_count));
                }
            }
            let Some((cut, _, left, right)) = best else {
                break;
            };
            for (b, value) in self.shape.iter_mut().enumerate() {
                *value += self.learning_rate * if b < cut { left } else { right };
            }
        }
        Ok(())
    }

    fn predict(&self, x: f64) -> f64 {
        match self.shape.get(self.bin(x)) {
            Some(value) => self.intercept + value,
            None => self.intercept,
        }
    }

    fn name(&self) -> &'static str {
        "GAM"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn learns_a_step() {
        let x: Vec<f64> = (0..40).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|&v| if v < 20.0 { 1.0 } else { 5.0 }).collect();
        let mut model = GamRegressor::default();
        model.fit(&x, &y).unwrap();
        assert_relative_eq!(model.predict(3.0), 1.0, epsilon = 1e-4);
        assert_relative_eq!(model.predict(33.0), 5.0, epsilon = 1e-4);
    }

    #[test]
    fn shape_follows_a_monotone_curve() {
        let x: Vec<f64> = (0..30).map(|i| i as f64 / 10.0).collect();
        let y: Vec<f64> = x.iter().map(|v| v * v).collect();
        let mut model = GamRegressor::default();
        model.fit(&x, &y).unwrap();
        assert!(model.predict(0.5) < model.predict(1.5));
        assert!(model.predict(1.5) < model.predict(2.5));
        assert!((model.predict(2.5) - 6.25).abs() < 1.0);
    }

    #[test]
    fn many_distinct_values_are_capped() {
        let x: Vec<f64> = (0..1000).map(|i| i as f64).collect();
        let y = x.clone();
        let mut model = GamRegressor::default().iterations(10);
        model.fit(&x, &y).unwrap();
        assert!(model.num_bins() <= MAX_BINS);
        assert!(model.num_bins() > 200);
    }

    #[test]
    fn constant_feature_predicts_mean() {
        let mut model = GamRegressor::default();
        model.fit(&[1.0, 1.0, 1.0], &[2.0, 4.0, 6.0]).unwrap();
        assert_eq!(model.num_bins(), 1);
        assert_relative_eq!(model.predict(1.0), 4.0);
    }
}
