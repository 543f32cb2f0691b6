//! Fixed-length per-index prediction vectors.
//!
//! Slot layout by producer:
//!
//! | Producer                         | Slots                                                      |
//! |----------------------------------|------------------------------------------------------------|
//! | spike / changepoint              | `[is_alert, raw_score, p_value]`                            |
//! | anomaly, score only              | `[is_anomaly, raw_score, magnitude]`                        |
//! | anomaly, score + expected value  | `[is_anomaly, raw_score, magnitude, expected_value]`        |
//! | anomaly, score + margin          | `[is_anomaly, anomaly_score, magnitude, expected_value, boundary_unit, upper_bound, lower_bound]` |

use serde::{Deserialize, Serialize};

/// Slot count of spike and changepoint vectors.
pub const ALERT_VECTOR_LEN: usize = 3;

/// One engine output row. The length is fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionVector {
    slots: Box<[f64]>,
}

impl PredictionVector {
    /// Build a vector from a fully populated slot array.
    pub fn from_slots<const N: usize>(slots: [f64; N]) -> Self {
        Self {
            slots: Box::new(slots),
        }
    }

    /// `[is_alert, raw_score, p_value]`.
    pub fn alert(is_alert: bool, raw_score: f64, p_value: f64) -> Self {
        Self::from_slots([flag(is_alert), raw_score, p_value])
    }

    /// The "no evidence" row: no alert, zero score, p-value 1.
    pub fn neutral_alert() -> Self {
        Self::alert(false, 0.0, 1.0)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.slots
    }

    pub fn get(&self, slot: usize) -> Option<f64> {
        self.slots.get(slot).copied()
    }

    /// Slot 0 interpreted as a flag.
    pub fn is_alert(&self) -> bool {
        self.slots.first().is_some_and(|&v| v == 1.0)
    }

    /// Slot 1: the raw (or anomaly) score.
    pub fn score(&self) -> f64 {
        self.get(1).unwrap_or(f64::NAN)
    }

    /// Slot 2: p-value for alert vectors, magnitude for anomaly vectors.
    pub fn uncertainty(&self) -> f64 {
        self.get(2).unwrap_or(f64::NAN)
    }

    /// Slot 3 of anomaly vectors in expected-value and margin modes.
    pub fn expected_value(&self) -> Option<f64> {
        self.get(3)
    }
}

impl std::ops::Index<usize> for PredictionVector {
    type Output = f64;

    fn index(&self, slot: usize) -> &f64 {
        &self.slots[slot]
    }
}

pub(crate) fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_vector_has_three_slots() {
        let v = PredictionVector::alert(true, 192.0, 0.0);
        assert_eq!(v.len(), ALERT_VECTOR_LEN);
        assert_eq!(v.as_slice(), &[1.0, 192.0, 0.0]);
        assert!(v.is_alert());
        assert_eq!(v.score(), 192.0);
        assert_eq!(v.uncertainty(), 0.0);
    }

    #[test]
    fn neutral_alert_carries_no_evidence() {
        let v = PredictionVector::neutral_alert();
        assert!(!v.is_alert());
        assert_eq!(v[2], 1.0);
    }

    #[test]
    fn from_slots_keeps_length() {
        let v = PredictionVector::from_slots([0.0; 7]);
        assert_eq!(v.len(), 7);
        assert_eq!(v.get(7), None);
    }
}
