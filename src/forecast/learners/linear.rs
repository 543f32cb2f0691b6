//! Linear learners: OLS, SDCA ridge and averaged online gradient descent.
//!
//! The stochastic learners fit the slope on mean-centred labels; the
//! intercept is the label mean, which is exact for a standardized feature.

use super::Regressor;
use crate::error::Result;
use crate::utils::ols::line_fit;
use crate::utils::stats::mean;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Ordinary least squares line.
#[derive(Debug, Clone, Default)]
pub struct OlsRegressor {
    intercept: f64,
    slope: f64,
}

impl Regressor for OlsRegressor {
    fn fit(&mut self, x: &[f64], y: &[f64]) -> Result<()> {
        if x.len() < 2 {
            self.intercept = mean(y);
            self.slope = 0.0;
            return Ok(());
        }
        let fit = line_fit(x, y)?;
        self.intercept = fit.intercept;
        self.slope = fit.coefficients[0];
        Ok(())
    }

    fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }

    fn name(&self) -> &'static str {
        "OLS"
    }
}

/// Ridge regression by stochastic dual coordinate ascent (squared loss).
#[derive(Debug, Clone)]
pub struct SdcaRegressor {
    l2: f64,
    epochs: usize,
    seed: u64,
    intercept: f64,
    slope: f64,
}

impl SdcaRegressor {
    pub fn new(seed: u64) -> Self {
        Self {
            l2: 1e-3,
            epochs: 500,
            seed,
            intercept: 0.0,
            slope: 0.0,
        }
    }

    pub fn l2(mut self, l2: f64) -> Self {
        self.l2 = l2;
        self
    }

    pub fn epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }
}

impl Regressor for SdcaRegressor {
    fn fit(&mut self, x: &[f64], y: &[f64]) -> Result<()> {
        let n = x.len();
        self.intercept = mean(y);
        self.slope = 0.0;
        if n == 0 {
            return Ok(());
        }

        let centred: Vec<f64> = y.iter().map(|v| v - self.intercept).collect();
        let lambda_n = self.l2 * n as f64;
        let mut alpha = vec![0.0; n];
        let mut order: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(self.seed);

        for _ in 0..self.epochs {
            order.shuffle(&mut rng);
            for &i in &order {
                let xi = x[i];
                let delta = (centred[i] - self.slope * xi - alpha[i]) / (1.0 + xi * xi / lambda_n);
                alpha[i] += delta;
                self.slope += delta * xi / lambda_n;
            }
        }
        Ok(())
    }

    fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }

    fn name(&self) -> &'static str {
        "SDCA"
    }
}

/// Averaged SGD on squared loss with step `learning_rate / sqrt(t)`.
#[derive(Debug, Clone)]
pub struct OgdRegressor {
    learning_rate: f64,
    epochs: usize,
    seed: u64,
    intercept: f64,
    slope: f64,
}

impl OgdRegressor {
    pub fn new(seed: u64) -> Self {
        Self {
            learning_rate: 0.1,
            epochs: 200,
            seed,
            intercept: 0.0,
            slope: 0.0,
        }
    }

    pub fn learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }
}

impl Regressor for OgdRegressor {
    fn fit(&mut self, x: &[f64], y: &[f64]) -> Result<()> {
        let n = x.len();
        self.intercept = mean(y);
        self.slope = 0.0;
        if n == 0 {
            return Ok(());
        }

        let centred: Vec<f64> = y.iter().map(|v| v - self.intercept).collect();
        let mut order: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut w = 0.0;
        let mut averaged = 0.0;
        let mut t = 0usize;

        for _ in 0..self.epochs {
            order.shuffle(&mut rng);
            for &i in &order {
                t += 1;
                let step = self.learning_rate / (t as f64).sqrt();
                w += step * (centred[i] - w * x[i]) * x[i];
                averaged += (w - averaged) / t as f64;
            }
        }
        self.slope = averaged;
        Ok(())
    }

    fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }

    fn name(&self) -> &'static str {
        "OGD"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Standardized grid and a line `y = 50 + 10 x`.
    fn line() -> (Vec<f64>, Vec<f64>) {
        let raw: Vec<f64> = (0..40).map(|i| i as f64).collect();
        let m = mean(&raw);
        let sd = (raw.iter().map(|v| (v - m).powi(2)).sum::<f64>() / raw.len() as f64).sqrt();
        let x: Vec<f64> = raw.iter().map(|v| (v - m) / sd).collect();
        let y = x.iter().map(|xi| 50.0 + 10.0 * xi).collect();
        (x, y)
    }

    #[test]
    fn ols_recovers_line() {
        let (x, y) = line();
        let mut model = OlsRegressor::default();
        model.fit(&x, &y).unwrap();
        assert_relative_eq!(model.predict(2.0), 70.0, epsilon = 1e-6);
    }

    #[test]
    fn sdca_approaches_least_squares() {
        let (x, y) = line();
        let mut model = SdcaRegressor::new(0);
        model.fit(&x, &y).unwrap();
        assert_relative_eq!(model.predict(0.0), 50.0, epsilon = 1e-9);
        assert_relative_eq!(model.predict(1.0), 60.0, max_relative = 1e-2);
    }

    #[test]
    fn ogd_approaches_least_squares() {
        let (x, y) = line();
        let mut model = OgdRegressor::new(0);
        model.fit(&x, &y).unwrap();
        assert_relative_eq!(model.predict(1.0), 60.0, max_relative = 2e-2);
    }

    #[test]
    fn stochastic_learners_are_seed_deterministic() {
        let (x, y) = line();
        let mut a = OgdRegressor::new(7);
        let mut b = OgdRegressor::new(7);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(0.5), b.predict(0.5));
    }

    #[test]
    fn single_point_is_constant() {
        let mut model = OlsRegressor::default();
        model.fit(&[0.0], &[4.0]).unwrap();
        assert_eq!(model.predict(3.0), 4.0);
    }
}
