//! A single dated observation.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Day number (days from the common era, Jan 1 of year 1 being day 1) of the
/// regression anchor date, 2023-01-01.
const ANCHOR_DAYS_FROM_CE: i32 = 738_521;

/// The anchor date used by [`DatedValue::days_since_anchor`].
pub fn anchor_date() -> NaiveDate {
    NaiveDate::from_num_days_from_ce_opt(ANCHOR_DAYS_FROM_CE).unwrap_or_default()
}

/// Integer day offset of `date` from the anchor date (negative before it).
pub fn days_since_anchor(date: NaiveDate) -> i64 {
    i64::from(date.num_days_from_ce()) - i64::from(ANCHOR_DAYS_FROM_CE)
}

/// A (date, value) observation at day granularity.
///
/// Missing observations are represented by a `NaN` value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DatedValue {
    date: NaiveDate,
    value: f64,
}

impl DatedValue {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }

    /// A missing observation at `date`.
    pub fn missing(date: NaiveDate) -> Self {
        Self {
            date,
            value: f64::NAN,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn is_missing(&self) -> bool {
        !self.value.is_finite()
    }

    /// Numeric projection of the date used as the regression feature.
    pub fn days_since_anchor(&self) -> i64 {
        days_since_anchor(self.date)
    }
}

impl From<(NaiveDate, i64)> for DatedValue {
    fn from((date, value): (NaiveDate, i64)) -> Self {
        Self::new(date, value as f64)
    }
}

impl From<(NaiveDate, f64)> for DatedValue {
    fn from((date, value): (NaiveDate, f64)) -> Self {
        Self::new(date, value)
    }
}
