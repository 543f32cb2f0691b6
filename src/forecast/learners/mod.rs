//! Regression learners over a single standardized feature.
//!
//! Every learner implements [`Regressor`]; [`Learner`] is the named,
//! serializable key that selects and builds one.

mod gam;
mod glm;
mod linear;
mod tree;

pub use gam::GamRegressor;
pub use glm::PoissonRegressor;
pub use linear::{OgdRegressor, OlsRegressor, SdcaRegressor};
pub use tree::{BoostedTrees, BoostingLoss, TreeParams};

use crate::error::{Result, SignalError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Common interface for all regression learners.
///
/// Object-safe; trained regressors are shared read-only between callers.
pub trait Regressor: fmt::Debug + Send + Sync {
    /// Fit on feature values `x` and labels `y` (equal length, all finite).
    fn fit(&mut self, x: &[f64], y: &[f64]) -> Result<()>;

    /// Predict the label for one feature value.
    fn predict(&self, x: f64) -> f64;

    /// Learner name.
    fn name(&self) -> &'static str;
}

/// Type alias for boxed regressor trait objects.
pub type BoxedRegressor = Box<dyn Regressor>;

/// Named regression learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Learner {
    /// Gradient-boosted regression trees.
    #[default]
    FastTree,
    /// Poisson regression (log link).
    Poisson,
    /// Ridge regression by stochastic dual coordinate ascent.
    Sdca,
    /// Boosted trees under Tweedie loss (log link).
    FastTreeTweedie,
    /// Leaf-wise gradient boosting with larger leaves.
    Gbm,
    /// Ordinary least squares.
    Ols,
    /// Averaged online gradient descent.
    #[serde(alias = "ODG", alias = "OGD")]
    Ogd,
    /// Generalized additive model of boosted stumps over feature bins.
    Gam,
}

impl Learner {
    pub const ALL: [Learner; 8] = [
        Learner::FastTree,
        Learner::Poisson,
        Learner::Sdca,
        Learner::FastTreeTweedie,
        Learner::Gbm,
        Learner::Ols,
        Learner::Ogd,
        Learner::Gam,
    ];

    /// Canonical name, as accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            Learner::FastTree => "FastTree",
            Learner::Poisson => "Poisson",
            Learner::Sdca => "SDCA",
            Learner::FastTreeTweedie => "FastTreeTweedie",
            Learner::Gbm => "GBM",
            Learner::Ols => "OLS",
            Learner::Ogd => "OGD",
            Learner::Gam => "GAM",
        }
    }

    /// Build an untrained regressor; `seed` drives the stochastic learners.
    pub fn build(self, seed: u64) -> BoxedRegressor {
        match self {
            Learner::FastTree => Box::new(BoostedTrees::new(TreeParams::fast_tree())),
            Learner::Poisson => Box::new(PoissonRegressor::default()),
            Learner::Sdca => Box::new(SdcaRegressor::new(seed)),
            Learner::FastTreeTweedie => Box::new(BoostedTrees::new(TreeParams::tweedie())),
            Learner::Gbm => Box::new(BoostedTrees::new(TreeParams::gbm())),
            Learner::Ols => Box::new(OlsRegressor::default()),
            Learner::Ogd => Box::new(OgdRegressor::new(seed)),
            Learner::Gam => Box::new(GamRegressor::default()),
        }
    }
}

impl fmt::Display for Learner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Learner {
    type Err = SignalError;

    /// Case-insensitive; a few long-form aliases are accepted.
    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_ascii_lowercase();
        let learner = match key.as_str() {
            "fasttree" => Learner::FastTree,
            "poisson" => Learner::Poisson,
            "sdca" => Learner::Sdca,
            "fasttreetweedie" | "tweedie" => Learner::FastTreeTweedie,
            "gbm" | "lightgbm" => Learner::Gbm,
            "ols" => Learner::Ols,
            "ogd" | "odg" | "onlinegradientdescent" => Learner::Ogd,
            "gam" => Learner::Gam,
            _ => {
                return Err(SignalError::config(
                    "learner",
                    format!("unknown regression learner '{s}'"),
                ))
            }
        };
        Ok(learner)
    }
}

/// Labels must be non-negative for log-link losses.
pub(crate) fn require_non_negative(y: &[f64], learner: &str) -> Result<()> {
    if let Some(v) = y.iter().find(|v| **v < 0.0) {
        return Err(SignalError::config(
            "learner",
            format!("{learner} requires non-negative values, found {v}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_case_insensitively() {
        for learner in Learner::ALL {
            assert_eq!(learner.name().parse::<Learner>().unwrap(), learner);
            assert_eq!(learner.name().to_lowercase().parse::<Learner>().unwrap(), learner);
            assert_eq!(learner.build(0).name(), learner.name());
        }
        assert_eq!("LightGbm".parse::<Learner>().unwrap(), Learner::Gbm);
    }

    #[test]
    fn odg_spelling_is_accepted_but_displayed_as_ogd() {
        assert_eq!("ODG".parse::<Learner>().unwrap(), Learner::Ogd);
        assert_eq!(Learner::Ogd.to_string(), "OGD");
        let learner: Learner = serde_json::from_str("\"ODG\"").unwrap();
        assert_eq!(learner, Learner::Ogd);
    }

    #[test]
    fn unknown_learner_names_the_parameter() {
        let err = "RandomForest".parse::<Learner>().unwrap_err();
        assert_eq!(err.parameter(), Some("learner"));
    }

    #[test]
    fn learner_deserializes_from_variant_name() {
        let learner: Learner = serde_json::from_str("\"Gam\"").unwrap();
        assert_eq!(learner, Learner::Gam);
    }
}
