//! Ordinary Least Squares (OLS) regression utilities.
//!
//! Used by the OLS regression learner and by the local linear fits that
//! replace anomalous points before expected-value reconstruction.

use crate::error::{Result, SignalError};
use crate::utils::linalg::solve_symmetric;

/// OLS regression coefficients and intercept.
#[derive(Debug, Clone, PartialEq)]
pub struct OLSResult {
    /// Regression coefficients (one per regressor column).
    pub coefficients: Vec<f64>,
    /// Intercept term.
    pub intercept: f64,
}

impl OLSResult {
    /// Predict one observation from its regressor values.
    pub fn predict_one(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(c, x)| c * x)
                .sum::<f64>()
    }

    /// Get the number of regressors.
    pub fn num_regressors(&self) -> usize {
        self.coefficients.len()
    }
}

/// Fit OLS regression: y = intercept + X @ coefficients
///
/// Uses Cholesky decomposition to solve the normal equations.
///
/// # Arguments
/// * `y` - Target values (length n)
/// * `columns` - Regressor columns (each length n)
pub fn ols_fit(y: &[f64], columns: &[&[f64]]) -> Result<OLSResult> {
    let n = y.len();

    if n == 0 {
        return Err(SignalError::InsufficientData { needed: 1, got: 0 });
    }

    if columns.is_empty() {
        let intercept = y.iter().sum::<f64>() / n as f64;
        return Ok(OLSResult {
            coefficients: vec![],
            intercept,
        });
    }

    for column in columns {
        if column.len() != n {
            return Err(SignalError::DimensionMismatch {
                expected: n,
                got: column.len(),
            });
        }
    }

    let k = columns.len();
    let num_params = k + 1;

    // X'X and X'y with an implicit leading column of ones.
    let mut xtx = vec![vec![0.0; num_params]; num_params];
    let mut xty = vec![0.0; num_params];

    for obs in 0..n {
        let y_obs = y[obs];
        xtx[0][0] += 1.0;
        for j in 0..k {
            let xj = columns[j][obs];
            xtx[0][j + 1] += xj;
            xtx[j + 1][0] += xj;
        }
        for i in 0..k {
            let xi = columns[i][obs];
            for j in 0..k {
                xtx[i + 1][j + 1] += xi * columns[j][obs];
            }
        }

        xty[0] += y_obs;
        for i in 0..k {
            xty[i + 1] += columns[i][obs] * y_obs;
        }
    }

    // Small ridge on the diagonal for numerical stability
    for (i, row) in xtx.iter_mut().enumerate() {
        row[i] += 1e-8;
    }

    let beta = solve_symmetric(&xtx, &xty).ok_or_else(|| {
        SignalError::NumericDegeneracy("OLS normal equations are not positive definite".into())
    })?;

    Ok(OLSResult {
        intercept: beta[0],
        coefficients: beta[1..].to_vec(),
    })
}

/// Fit a straight line `y = intercept + slope * x`.
pub fn line_fit(x: &[f64], y: &[f64]) -> Result<OLSResult> {
    ols_fit(y, &[x])
}
