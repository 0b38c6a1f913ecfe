//! User-authored custom metrics and their registry.
//!
//! Registration runs the formula through the same parser evaluation uses,
//! so a stored metric can never fail with a syntax or disallowed-construct
//! error at render time.

use adpulse_core::error::{AnalyticsError, AnalyticsResult};
use adpulse_core::types::MetricFormat;
use adpulse_formula::{evaluate_with_limits, validate_with_limits, Environment, EvalLimits, FormulaError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// A named formula evaluated against a funnel's totals on every render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomMetric {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub formula: String,
    pub format: MetricFormat,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CustomMetric {
    pub fn new(
        workspace_id: Uuid,
        name: impl Into<String>,
        formula: impl Into<String>,
        format: MetricFormat,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            workspace_id,
            name: name.into(),
            description: None,
            formula: formula.into(),
            format,
            created_at: now,
            updated_at: now,
        }
    }
}

/// In-memory custom-metric registry with save-time formula validation.
pub struct CustomMetricRegistry {
    metrics: dashmap::DashMap<Uuid, CustomMetric>,
    limits: EvalLimits,
}

impl CustomMetricRegistry {
    pub fn new() -> Self {
        Self::with_limits(EvalLimits::default())
    }

    pub fn with_limits(limits: EvalLimits) -> Self {
        Self {
            metrics: dashmap::DashMap::new(),
            limits,
        }
    }

    /// Register a metric, rejecting formulas that fail validation. A metric
    /// that passes here can only fail later for environment- or
    /// value-dependent reasons (unknown key, division by zero).
    pub fn register(&self, metric: CustomMetric) -> AnalyticsResult<()> {
        validate_with_limits(&metric.formula, self.limits).map_err(|err| {
            AnalyticsError::Formula(format!(
                "custom metric '{}' has an invalid formula: {err}",
                metric.name
            ))
        })?;
        info!(metric = %metric.name, workspace = %metric.workspace_id, "custom metric registered");
        self.metrics.insert(metric.id, metric);
        Ok(())
    }

    /// Insert without validation, for loading metrics persisted before
    /// formula validation existed. Render-time evaluation still degrades
    /// to a per-metric error, never a crash.
    pub fn insert_unvalidated(&self, metric: CustomMetric) {
        self.metrics.insert(metric.id, metric);
    }

    /// Evaluate one metric against a funnel environment.
    pub fn compute(&self, metric: &CustomMetric, env: &Environment) -> Result<f64, FormulaError> {
        evaluate_with_limits(&metric.formula, env, self.limits)
    }

    pub fn get(&self, id: &Uuid) -> Option<CustomMetric> {
        self.metrics.get(id).map(|m| m.clone())
    }

    pub fn remove(&self, id: &Uuid) -> Option<CustomMetric> {
        self.metrics.remove(id).map(|(_, m)| m)
    }

    pub fn list_for_workspace(&self, workspace_id: &Uuid) -> Vec<CustomMetric> {
        let mut metrics: Vec<CustomMetric> = self
            .metrics
            .iter()
            .filter(|m| m.value().workspace_id == *workspace_id)
            .map(|m| m.value().clone())
            .collect();
        metrics.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        metrics
    }
}

impl Default for CustomMetricRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adpulse_core::types::FunnelTotals;

    #[test]
    fn registration_validates_the_formula() {
        let registry = CustomMetricRegistry::new();
        let workspace = Uuid::new_v4();

        let roas = CustomMetric::new(
            workspace,
            "True ROAS",
            "totalRevenue / totalSpent",
            MetricFormat::Decimal,
        );
        registry.register(roas).unwrap();

        let injected = CustomMetric::new(
            workspace,
            "Injected",
            "require(\"fs\")",
            MetricFormat::Number,
        );
        let id = injected.id;
        assert!(matches!(
            registry.register(injected),
            Err(AnalyticsError::Formula(_))
        ));
        assert!(registry.get(&id).is_none());
    }

    #[test]
    fn registered_metric_computes_against_totals() {
        let registry = CustomMetricRegistry::new();
        let workspace = Uuid::new_v4();
        let metric = CustomMetric::new(
            workspace,
            "Cost per Purchase",
            "round(totalSpent / totalPurchases, 2)",
            MetricFormat::Currency,
        );
        registry.register(metric.clone()).unwrap();

        let totals = FunnelTotals {
            total_spent: 99.5,
            total_purchases: 3.0,
            ..Default::default()
        };
        let value = registry.compute(&metric, &totals.to_env()).unwrap();
        assert_eq!(value, 33.17);
    }

    #[test]
    fn compute_surfaces_unknown_identifiers() {
        let registry = CustomMetricRegistry::new();
        let metric = CustomMetric::new(
            Uuid::new_v4(),
            "Bad Reference",
            "totalSpend + 1",
            MetricFormat::Number,
        );
        // "totalSpend" parses fine (it is a plausible identifier) so
        // registration succeeds; the environment lookup is what fails.
        registry.register(metric.clone()).unwrap();
        assert_eq!(
            registry.compute(&metric, &FunnelTotals::default().to_env()),
            Err(FormulaError::UnknownIdentifier("totalSpend".to_string()))
        );
    }
}
