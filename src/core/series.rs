//! Date-ordered series of observations.
//!
//! [`OrderedSeries`] is the input of every engine in the crate. Building one
//! through [`OrderedSeries::from_points`] sorts the raw points by date, which
//! is the precondition shared by all downstream algorithms.

use crate::core::DatedValue;
use crate::error::{Result, SignalError};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// A sequence of observations, non-decreasing by date (ties allowed).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderedSeries {
    points: Vec<DatedValue>,
}

impl OrderedSeries {
    /// Create an empty series.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sort raw points ascending by date.
    ///
    /// The sort is stable, so points sharing a date keep their input order.
    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<DatedValue>,
    {
        let mut points: Vec<DatedValue> = points.into_iter().map(Into::into).collect();
        points.sort_by_key(|p| p.date());
        Self { points }
    }

    /// Wrap points that are already ordered, rejecting out-of-order input.
    pub fn from_sorted(points: Vec<DatedValue>) -> Result<Self> {
        if let Some(index) = (1..points.len()).find(|&i| points[i].date() < points[i - 1].date())
        {
            return Err(SignalError::Unordered { index });
        }
        Ok(Self { points })
    }

    /// Build a weekly series: `values[i]` is dated `start + 7 * i` days.
    pub fn weekly(start: NaiveDate, values: &[f64]) -> Self {
        let points = values
            .iter()
            .enumerate()
            .map(|(i, &v)| DatedValue::new(start + Duration::weeks(i as i64), v))
            .collect();
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[DatedValue] {
        &self.points
    }

    pub fn get(&self, index: usize) -> Option<&DatedValue> {
        self.points.get(index)
    }

    pub fn first(&self) -> Option<&DatedValue> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&DatedValue> {
        self.points.last()
    }

    /// Observed values in date order (`NaN` for missing observations).
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value()).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date()).collect()
    }

    /// Regression feature of every point: days since the anchor date.
    pub fn day_offsets(&self) -> Vec<f64> {
        self.points
            .iter()
            .map(|p| p.days_since_anchor() as f64)
            .collect()
    }

    /// Missing-value indicator column.
    pub fn missing_mask(&self) -> Vec<bool> {
        self.points.iter().map(|p| p.is_missing()).collect()
    }

    pub fn has_missing(&self) -> bool {
        self.points.iter().any(|p| p.is_missing())
    }

    /// Fail with [`SignalError::InsufficientData`] unless `len() >= needed`.
    pub fn require_len(&self, needed: usize) -> Result<()> {
        if self.points.len() < needed {
            return Err(SignalError::InsufficientData {
                needed,
                got: self.points.len(),
            });
        }
        Ok(())
    }
}

impl FromIterator<DatedValue> for OrderedSeries {
    fn from_iter<T: IntoIterator<Item = DatedValue>>(iter: T) -> Self {
        Self::from_points(iter)
    }
}

/// Replace non-finite values with the previous finite value.
///
/// Leading gaps take the first finite value; an all-missing input becomes zeros.
pub fn forward_fill(values: &[f64]) -> Vec<f64> {
    let first = values.iter().copied().find(|v| v.is_finite()).unwrap_or(0.0);
    let mut last = first;
    values
        .iter()
        .map(|&v| {
            if v.is_finite() {
                last = v;
            }
            last
        })
        .collect()
}
