//! Core data structures: dated observations, ordered series, engine outputs.

mod dated_value;
mod forecast;
pub(crate) mod prediction;
mod records;
mod series;

pub use dated_value::{anchor_date, days_since_anchor, DatedValue};
pub use forecast::Forecast;
pub use prediction::{PredictionVector, ALERT_VECTOR_LEN};
pub use records::{AlertRecord, ForecastRecord};
pub use series::{forward_fill, OrderedSeries};
