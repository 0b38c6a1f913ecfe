//! Funnel entities and the workspace funnel registry.

use std::collections::HashMap;

use adpulse_core::config::FilterConfig;
use adpulse_core::error::AnalyticsResult;
use adpulse_core::types::AdRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::engine;
use crate::rules::RuleSet;

/// A named, user-defined filtered view over ad-performance records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Funnel {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub rules: RuleSet,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Funnel {
    pub fn new(workspace_id: Uuid, name: impl Into<String>, rules: RuleSet) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            workspace_id,
            name: name.into(),
            description: None,
            rules,
            created_at: now,
            updated_at: now,
        }
    }
}

/// In-memory funnel registry. Rules are validated at registration so an
/// unparseable regex never reaches the matching loop.
pub struct FunnelRegistry {
    funnels: dashmap::DashMap<Uuid, Funnel>,
    config: FilterConfig,
}

impl FunnelRegistry {
    pub fn new() -> Self {
        Self::with_config(FilterConfig::default())
    }

    pub fn with_config(config: FilterConfig) -> Self {
        Self {
            funnels: dashmap::DashMap::new(),
            config,
        }
    }

    pub fn register(&self, funnel: Funnel) -> AnalyticsResult<()> {
        engine::validate_rules(&funnel.rules, &self.config)?;
        info!(funnel = %funnel.name, workspace = %funnel.workspace_id, "funnel registered");
        self.funnels.insert(funnel.id, funnel);
        Ok(())
    }

    pub fn get(&self, id: &Uuid) -> Option<Funnel> {
        self.funnels.get(id).map(|f| f.clone())
    }

    pub fn remove(&self, id: &Uuid) -> Option<Funnel> {
        self.funnels.remove(id).map(|(_, f)| f)
    }

    pub fn list_for_workspace(&self, workspace_id: &Uuid) -> Vec<Funnel> {
        let mut funnels: Vec<Funnel> = self
            .funnels
            .iter()
            .filter(|f| f.value().workspace_id == *workspace_id)
            .map(|f| f.value().clone())
            .collect();
        funnels.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        funnels
    }

    /// Assign each record to every funnel it matches. Records matching no
    /// funnel are dropped; funnels matching no record get no entry.
    ///
    /// Each funnel's rules compile once, under the same [`FilterConfig`]
    /// registration validated them with, and are reused for every record.
    pub fn partition(
        &self,
        workspace_id: &Uuid,
        records: &[AdRecord],
    ) -> HashMap<Uuid, Vec<AdRecord>> {
        let funnels = self.list_for_workspace(workspace_id);
        let compiled: Vec<(Uuid, engine::CompiledRuleSet)> = funnels
            .iter()
            .map(|f| (f.id, engine::CompiledRuleSet::compile(&f.rules, &self.config)))
            .collect();
        let mut partitions: HashMap<Uuid, Vec<AdRecord>> = HashMap::new();
        for record in records {
            for (funnel_id, rules) in &compiled {
                if rules.matches(record) {
                    partitions.entry(*funnel_id).or_default().push(record.clone());
                }
            }
        }
        debug!(
            workspace = %workspace_id,
            records = records.len(),
            funnels = funnels.len(),
            "partitioned records into funnels"
        );
        partitions
    }
}

impl Default for FunnelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{FilterField, FilterOperator, FilterRule};
    use adpulse_core::error::AnalyticsError;
    use adpulse_core::types::AdProvider;
    use chrono::NaiveDate;

    fn record(workspace_id: Uuid, campaign_name: &str) -> AdRecord {
        AdRecord {
            workspace_id,
            provider: AdProvider::Google,
            date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            campaign_name: campaign_name.to_string(),
            campaign_id: "c-1".to_string(),
            adset_name: "Broad".to_string(),
            adset_id: "as-1".to_string(),
            ad_name: "Ad".to_string(),
            ad_id: "ad-1".to_string(),
            spend: 5.0,
            revenue: 20.0,
            reach: 100,
            impressions: 150,
            clicks: 10,
            link_clicks: 8,
            purchases: 1,
        }
    }

    fn contains_rule(value: &str) -> RuleSet {
        RuleSet::Flat(vec![FilterRule {
            field: FilterField::CampaignName,
            operator: FilterOperator::Contains,
            value: value.to_string(),
            case_sensitive: false,
        }])
    }

    #[test]
    fn partition_assigns_records_to_matching_funnels() {
        let workspace = Uuid::new_v4();
        let registry = FunnelRegistry::new();

        let prospecting = Funnel::new(workspace, "Prospecting", contains_rule("prospecting"));
        let retargeting = Funnel::new(workspace, "Retargeting", contains_rule("retargeting"));
        let prospecting_id = prospecting.id;
        let retargeting_id = retargeting.id;
        registry.register(prospecting).unwrap();
        registry.register(retargeting).unwrap();

        let records = vec![
            record(workspace, "Summer Prospecting"),
            record(workspace, "Winter Retargeting"),
            record(workspace, "Prospecting + Retargeting Mix"),
            record(workspace, "Brand Awareness"),
        ];

        let partitions = registry.partition(&workspace, &records);
        assert_eq!(partitions[&prospecting_id].len(), 2);
        assert_eq!(partitions[&retargeting_id].len(), 2);
    }

    #[test]
    fn registration_rejects_invalid_regex() {
        let registry = FunnelRegistry::new();
        let funnel = Funnel::new(
            Uuid::new_v4(),
            "Broken",
            RuleSet::Flat(vec![FilterRule {
                field: FilterField::AdName,
                operator: FilterOperator::Regex,
                value: "([unclosed".to_string(),
                case_sensitive: false,
            }]),
        );
        let id = funnel.id;
        assert!(matches!(
            registry.register(funnel),
            Err(AnalyticsError::Validation(_))
        ));
        assert!(registry.get(&id).is_none());
    }

    #[test]
    fn configured_regex_limit_applies_at_save_and_match_time() {
        // A pattern whose compiled size exceeds the default limit but fits
        // the configured one: registration must accept it and partitioning
        // must match with it, under the same config.
        let registry = FunnelRegistry::with_config(FilterConfig {
            regex_size_limit_bytes: 512 << 20,
        });
        let workspace = Uuid::new_v4();
        let funnel = Funnel::new(
            workspace,
            "Big pattern",
            RuleSet::Flat(vec![FilterRule {
                field: FilterField::CampaignName,
                operator: FilterOperator::Regex,
                value: "a{1,300000}".to_string(),
                case_sensitive: false,
            }]),
        );
        let id = funnel.id;
        registry.register(funnel).unwrap();

        let partitions = registry.partition(&workspace, &[record(workspace, "aaaa")]);
        assert_eq!(partitions[&id].len(), 1);
    }

    #[test]
    fn listing_is_scoped_to_the_workspace() {
        let registry = FunnelRegistry::new();
        let ws_a = Uuid::new_v4();
        let ws_b = Uuid::new_v4();
        registry.register(Funnel::new(ws_a, "A", RuleSet::default())).unwrap();
        registry.register(Funnel::new(ws_b, "B", RuleSet::default())).unwrap();

        let listed = registry.list_for_workspace(&ws_a);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "A");
    }
}
