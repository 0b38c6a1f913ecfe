//! Metric computation — aggregation of ad records into funnel totals,
//! user-defined custom metrics, and goal tracking against metric values.

pub mod aggregate;
pub mod custom;
pub mod goals;

pub use aggregate::aggregate;
pub use custom::{CustomMetric, CustomMetricRegistry};
pub use goals::{Goal, GoalDirection, GoalStatus, GoalTracker};
