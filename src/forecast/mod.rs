//! Forecasting entry points.
//!
//! Two paths share the train-then-forecast shape: [`train_ssa`] returns an
//! immutable [`SsaTrainedModel`] consumed by [`forecast_ssa`], and
//! [`train_regression`] returns a [`RegressionModel`] consumed by
//! [`forecast_regression`]. Models are `Send + Sync` and are only read when
//! forecasting.

pub mod learners;
mod regression;
mod ssa;

pub use learners::{BoxedRegressor, Learner, Regressor};
pub use regression::{
    forecast_regression, forecast_regression_weekly, train_regression, train_regression_with,
    RegressionConfig, RegressionModel, RegressionTraining,
};
pub use ssa::{
    forecast_ssa, forecast_ssa_default, train_ssa, train_ssa_with, SsaTrainedModel, SsaTraining,
};

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn trained_models_are_shareable() {
        assert_send_sync::<SsaTrainedModel>();
        assert_send_sync::<RegressionModel>();
    }
}
