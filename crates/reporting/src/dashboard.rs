//! Workspace dashboard rendering.
//!
//! A render partitions the workspace's ad records into funnels, aggregates
//! each funnel into totals, evaluates every custom metric against those
//! totals, and attaches goal statuses. Each metric is evaluated
//! independently: one malformed stored formula yields an error badge on
//! that metric's slot, never a failed render.

use std::collections::HashMap;

use adpulse_core::config::AppConfig;
use adpulse_core::types::{AdRecord, FunnelTotals, MetricFormat};
use adpulse_formula::EvalLimits;
use adpulse_funnels::FunnelRegistry;
use adpulse_metrics::{CustomMetricRegistry, GoalStatus, GoalTracker};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

/// One custom metric's computed value for one funnel. Exactly one of
/// `value` and `error` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricValue {
    pub metric_id: Uuid,
    pub name: String,
    pub format: MetricFormat,
    pub value: Option<f64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunnelReport {
    pub funnel_id: Uuid,
    pub name: String,
    pub record_count: usize,
    pub totals: FunnelTotals,
    pub metrics: Vec<MetricValue>,
    pub goals: Vec<GoalStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub workspace_id: Uuid,
    pub funnels: Vec<FunnelReport>,
    pub generated_at: DateTime<Utc>,
}

/// Holds the workspace registries and renders dashboard snapshots.
pub struct ReportEngine {
    funnels: FunnelRegistry,
    metrics: CustomMetricRegistry,
    goals: GoalTracker,
}

impl ReportEngine {
    pub fn new() -> Self {
        Self {
            funnels: FunnelRegistry::new(),
            metrics: CustomMetricRegistry::new(),
            goals: GoalTracker::new(),
        }
    }

    pub fn with_config(config: &AppConfig) -> Self {
        Self {
            funnels: FunnelRegistry::with_config(config.filters.clone()),
            metrics: CustomMetricRegistry::with_limits(EvalLimits::from(&config.formula)),
            goals: GoalTracker::new(),
        }
    }

    pub fn funnels(&self) -> &FunnelRegistry {
        &self.funnels
    }

    pub fn metrics(&self) -> &CustomMetricRegistry {
        &self.metrics
    }

    pub fn goals(&self) -> &GoalTracker {
        &self.goals
    }

    /// Render one workspace's dashboard from its raw ad records.
    pub fn render(&self, workspace_id: Uuid, records: &[AdRecord]) -> DashboardSnapshot {
        let partitions = self.funnels.partition(&workspace_id, records);
        let custom_metrics = self.metrics.list_for_workspace(&workspace_id);

        let mut reports = Vec::new();
        for funnel in self.funnels.list_for_workspace(&workspace_id) {
            let rows = partitions.get(&funnel.id).map(Vec::as_slice).unwrap_or(&[]);
            let totals = adpulse_metrics::aggregate(rows);
            let env = totals.to_env();

            let mut computed: HashMap<String, f64> = HashMap::new();
            let mut by_id: HashMap<Uuid, f64> = HashMap::new();
            let metrics: Vec<MetricValue> = custom_metrics
                .iter()
                .map(|metric| match self.metrics.compute(metric, &env) {
                    Ok(value) => {
                        computed.insert(metric.name.clone(), value);
                        by_id.insert(metric.id, value);
                        MetricValue {
                            metric_id: metric.id,
                            name: metric.name.clone(),
                            format: metric.format,
                            value: Some(value),
                            error: None,
                        }
                    }
                    Err(err) => {
                        warn!(
                            metric = %metric.name,
                            funnel = %funnel.name,
                            error = %err,
                            "custom metric failed to evaluate"
                        );
                        MetricValue {
                            metric_id: metric.id,
                            name: metric.name.clone(),
                            format: metric.format,
                            value: None,
                            error: Some(err.to_string()),
                        }
                    }
                })
                .collect();

            let goals: Vec<GoalStatus> = self
                .goals
                .goals_for(&workspace_id, &funnel.id)
                .iter()
                .map(|goal| {
                    // A goal tracks either an aggregate total, a custom
                    // metric by id, or a custom metric by name.
                    let current = goal
                        .custom_metric_id
                        .and_then(|id| by_id.get(&id).copied())
                        .or_else(|| env.get(&goal.metric_key).copied())
                        .or_else(|| computed.get(&goal.metric_key).copied());
                    GoalTracker::status(goal, current)
                })
                .collect();

            reports.push(FunnelReport {
                funnel_id: funnel.id,
                name: funnel.name.clone(),
                record_count: rows.len(),
                totals,
                metrics,
                goals,
            });
        }

        debug!(
            workspace = %workspace_id,
            funnels = reports.len(),
            records = records.len(),
            "dashboard rendered"
        );

        DashboardSnapshot {
            workspace_id,
            funnels: reports,
            generated_at: Utc::now(),
        }
    }
}

impl Default for ReportEngine {
    fn default() -> Self {
        Self::new()
    }
}
