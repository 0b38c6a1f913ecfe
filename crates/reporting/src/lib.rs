//! Dashboard assembly — one render per workspace, composing the filter
//! engine, aggregation, formula evaluator, and goal tracking.

pub mod dashboard;

pub use dashboard::{DashboardSnapshot, FunnelReport, MetricValue, ReportEngine};
