//! Reference plugins.
//!
//! These read the pod metrics snapshot by key and carry no production
//! load-balancing policy of their own.
//!
//! - **`filter`**: metric threshold, adapter loaded
//! - **`scorer`**: min-max normalized metric
//! - **`picker`**: highest score with name tie-break

pub mod filter;
pub mod picker;
pub mod scorer;

pub use filter::{AdapterLoadedFilter, MetricThresholdFilter, MetricThresholdParams};
pub use picker::MaxScorePicker;
pub use scorer::{MetricScorer, MetricScorerParams};
