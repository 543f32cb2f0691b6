//! Forecast result structure for holding predictions.

use crate::error::{Result, SignalError};

/// A univariate forecast: point predictions and optional interval bounds.
///
/// When bounds are present they have the same length as the point series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Forecast {
    point: Vec<f64>,
    lower: Option<Vec<f64>>,
    upper: Option<Vec<f64>>,
}

impl Forecast {
    /// Create an empty forecast.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a forecast from point predictions only.
    pub fn from_values(values: Vec<f64>) -> Self {
        Self {
            point: values,
            lower: None,
            upper: None,
        }
    }

    /// Create a forecast with prediction intervals.
    ///
    /// Fails with [`SignalError::DimensionMismatch`] if a bound series has a
    /// different length than `values`.
    pub fn from_values_with_intervals(
        values: Vec<f64>,
        lower: Vec<f64>,
        upper: Vec<f64>,
    ) -> Result<Self> {
        for bound in [&lower, &upper] {
            if bound.len() != values.len() {
                return Err(SignalError::DimensionMismatch {
                    expected: values.len(),
                    got: bound.len(),
                });
            }
        }
        Ok(Self {
            point: values,
            lower: Some(lower),
            upper: Some(upper),
        })
    }

    /// Forecast horizon (number of steps).
    pub fn horizon(&self) -> usize {
        self.point.len()
    }

    pub fn is_empty(&self) -> bool {
        self.point.is_empty()
    }

    pub fn point(&self) -> &[f64] {
        &self.point
    }

    pub fn has_intervals(&self) -> bool {
        self.lower.is_some() && self.upper.is_some()
    }

    pub fn lower(&self) -> Option<&[f64]> {
        self.lower.as_deref()
    }

    pub fn upper(&self) -> Option<&[f64]> {
        self.upper.as_deref()
    }

    /// `(point, lower, upper)` at step `h`, bounds `None` without intervals.
    pub fn step(&self, h: usize) -> Option<(f64, Option<f64>, Option<f64>)> {
        let point = *self.point.get(h)?;
        let lower = self.lower.as_ref().and_then(|l| l.get(h).copied());
        let upper = self.upper.as_ref().and_then(|u| u.get(h).copied());
        Some((point, lower, upper))
    }
}
