//! Filter rule types for funnel criteria.
//!
//! The stored shape is polymorphic: a funnel's rules are either a flat rule
//! array (implicit AND) or a single `{logic, rules}` group. Groups of groups
//! are not part of the data model; [`RuleSet`] is deliberately non-recursive.

use adpulse_core::types::AdRecord;
use serde::{Deserialize, Serialize};

/// The six campaign-record attributes a rule may filter on. A closed enum
/// with one accessor per variant keeps the engine exhaustive — there is no
/// dynamic field lookup.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FilterField {
    CampaignName,
    CampaignId,
    AdsetName,
    AdsetId,
    AdName,
    AdId,
}

impl FilterField {
    pub fn extract<'a>(&self, record: &'a AdRecord) -> &'a str {
        match self {
            Self::CampaignName => &record.campaign_name,
            Self::CampaignId => &record.campaign_id,
            Self::AdsetName => &record.adset_name,
            Self::AdsetId => &record.adset_id,
            Self::AdName => &record.ad_name,
            Self::AdId => &record.ad_id,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    Equals,
    NotEquals,
    Regex,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilterRule {
    pub field: FilterField,
    pub operator: FilterOperator,
    pub value: String,
    #[serde(default)]
    pub case_sensitive: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum GroupLogic {
    And,
    Or,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilterGroup {
    pub logic: GroupLogic,
    pub rules: Vec<FilterRule>,
}

/// A funnel's stored rules. A bare array is semantically an AND group;
/// normalization happens here at the boundary so the engine has one code
/// path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RuleSet {
    Group(FilterGroup),
    Flat(Vec<FilterRule>),
}

impl RuleSet {
    /// Normalize to `(logic, rules)`. Flat lists become AND groups.
    pub fn as_group(&self) -> (GroupLogic, &[FilterRule]) {
        match self {
            Self::Group(group) => (group.logic, &group.rules),
            Self::Flat(rules) => (GroupLogic::And, rules),
        }
    }

    pub fn rules(&self) -> &[FilterRule] {
        self.as_group().1
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::Flat(Vec::new())
    }
}
