//! Poisson regression with a log link, fitted by iteratively reweighted
//! least squares.

use super::{require_non_negative, Regressor};
use crate::error::{Result, SignalError};
use crate::utils::linalg::solve_symmetric;
use crate::utils::stats::mean;

/// Linear predictor bound before exponentiation.
const MAX_ETA: f64 = 50.0;

#[derive(Debug, Clone)]
pub struct PoissonRegressor {
    l2: f64,
    max_iterations: usize,
    tolerance: f64,
    intercept: f64,
    slope: f64,
}

impl Default for PoissonRegressor {
    fn default() -> Self {
        Self {
            l2: 1e-2,
            max_iterations: 100,
            tolerance: 1e-10,
            intercept: 0.0,
            slope: 0.0,
        }
    }
}

impl PoissonRegressor {
    pub fn l2(mut self, l2: f64) -> Self {
        self.l2 = l2;
        self
    }

    fn eta(&self, x: f64) -> f64 {
        (self.intercept + self.slope * x).clamp(-MAX_ETA, MAX_ETA)
    }
}

impl Regressor for PoissonRegressor {
    fn fit(&mut self, x: &[f64], y: &[f64]) -> Result<()> {
        require_non_negative(y, self.name())?;
        self.intercept = mean(y).max(1e-8).ln();
        self.slope = 0.0;
        if x.len() < 2 {
            return Ok(());
        }

        for iteration in 0..self.max_iterations {
            // Normal equations of the weighted least squares step, with the
            // working response folded in: W z = W eta + (y - mu).
            let mut xtwx = [[0.0; 2]; 2];
            let mut xtwz = [0.0; 2];
            for (&xi, &yi) in x.iter().zip(y) {
                let eta = self.eta(xi);
                let mu = eta.exp();
                let wz = mu * eta + (yi - mu);
                xtwx[0][0] += mu;
                xtwx[0][1] += mu * xi;
                xtwx[1][1] += mu * xi * xi;
                xtwz[0] += wz;
                xtwz[1] += wz * xi;
            }
            xtwx[1][0] = xtwx[0][1];
            xtwx[1][1] += self.l2 * x.len() as f64;

            let system = vec![xtwx[0].to_vec(), xtwx[1].to_vec()];
            let beta = solve_symmetric(&system, &xtwz).ok_or_else(|| {
                SignalError::NumericDegeneracy("Poisson IRLS system is singular".to_string())
            })?;

            let change = (beta[0] - self.intercept).abs() + (beta[1] - self.slope).abs();
            self.intercept = beta[0].clamp(-MAX_ETA, MAX_ETA);
            self.slope = beta[1];
            if change < self.tolerance {
                log::debug!("Poisson IRLS converged after {} iterations", iteration + 1);
                break;
            }
        }
        Ok(())
    }

    fn predict(&self, x: f64) -> f64 {
        self.eta(x).exp()
    }

    fn name(&self) -> &'static str {
        "Poisson"
    }
}
