//! The filter engine — matches one ad record against a funnel's rule set.
//!
//! Pure and total: for well-typed input there is no error outcome. The one
//! fault a stored rule can carry is an invalid regex pattern, which fails
//! closed (non-match) with a `warn!` — this predicate runs once per record
//! per funnel per render and must never abort the pass.
//!
//! Regex rules compile once, in [`CompiledRuleSet::compile`], under the same
//! [`FilterConfig`] the owning registry validates with at save time. A
//! pattern accepted by [`validate_rule`] therefore always compiles again at
//! match time.

use adpulse_core::config::FilterConfig;
use adpulse_core::error::{AnalyticsError, AnalyticsResult};
use adpulse_core::types::AdRecord;
use regex::RegexBuilder;
use tracing::warn;

use crate::rules::{FilterOperator, FilterRule, GroupLogic, RuleSet};

/// Does this record belong to a funnel with these rules?
///
/// Convenience entry point that compiles under the default [`FilterConfig`].
/// Callers with a configured regex limit (the registry) compile once via
/// [`CompiledRuleSet`] and reuse it across records.
pub fn matches(record: &AdRecord, rules: &RuleSet) -> bool {
    CompiledRuleSet::compile(rules, &FilterConfig::default()).matches(record)
}

/// A rule set with its regex patterns compiled once, ready for the hot
/// matching loop.
pub struct CompiledRuleSet {
    logic: GroupLogic,
    rules: Vec<CompiledRule>,
}

struct CompiledRule {
    rule: FilterRule,
    /// Compiled pattern for regex rules; `None` for text operators, and for
    /// invalid patterns, which then match nothing.
    regex: Option<regex::Regex>,
}

impl CompiledRuleSet {
    pub fn compile(rules: &RuleSet, config: &FilterConfig) -> Self {
        let (logic, list) = rules.as_group();
        let rules = list
            .iter()
            .map(|rule| {
                let regex = if rule.operator == FilterOperator::Regex {
                    match build_regex(rule, config) {
                        Ok(pattern) => Some(pattern),
                        Err(err) => {
                            // Fail closed: a broken stored pattern matches
                            // nothing.
                            warn!(
                                pattern = %rule.value,
                                error = %err,
                                "invalid filter regex, treating as non-match"
                            );
                            None
                        }
                    }
                } else {
                    None
                };
                CompiledRule {
                    rule: rule.clone(),
                    regex,
                }
            })
            .collect();
        Self { logic, rules }
    }

    /// AND groups short-circuit at the first non-matching rule and are
    /// vacuously true when empty; OR groups short-circuit at the first
    /// match and are vacuously false when empty.
    pub fn matches(&self, record: &AdRecord) -> bool {
        match self.logic {
            GroupLogic::And => self.rules.iter().all(|rule| rule.matches(record)),
            GroupLogic::Or => self.rules.iter().any(|rule| rule.matches(record)),
        }
    }
}

impl CompiledRule {
    fn matches(&self, record: &AdRecord) -> bool {
        let actual = self.rule.field.extract(record);

        if self.rule.operator == FilterOperator::Regex {
            return self.regex.as_ref().is_some_and(|re| re.is_match(actual));
        }

        let (actual, expected) = if self.rule.case_sensitive {
            (actual.to_string(), self.rule.value.clone())
        } else {
            (actual.to_lowercase(), self.rule.value.to_lowercase())
        };

        match self.rule.operator {
            FilterOperator::Contains => actual.contains(&expected),
            FilterOperator::NotContains => !actual.contains(&expected),
            FilterOperator::StartsWith => actual.starts_with(&expected),
            FilterOperator::EndsWith => actual.ends_with(&expected),
            FilterOperator::Equals => actual == expected,
            FilterOperator::NotEquals => actual != expected,
            FilterOperator::Regex => unreachable!("handled above"),
        }
    }
}

fn build_regex(rule: &FilterRule, config: &FilterConfig) -> Result<regex::Regex, regex::Error> {
    RegexBuilder::new(&rule.value)
        .case_insensitive(!rule.case_sensitive)
        .size_limit(config.regex_size_limit_bytes)
        .build()
}

/// Save-time validation for a single rule, so the storage layer rejects bad
/// regex patterns before they ever reach the hot matching loop. Uses the
/// same config as match-time compilation.
pub fn validate_rule(rule: &FilterRule, config: &FilterConfig) -> AnalyticsResult<()> {
    if rule.operator == FilterOperator::Regex {
        build_regex(rule, config).map_err(|err| {
            AnalyticsError::Validation(format!("invalid regex pattern '{}': {err}", rule.value))
        })?;
    }
    Ok(())
}

/// Validate every rule in a rule set.
pub fn validate_rules(rules: &RuleSet, config: &FilterConfig) -> AnalyticsResult<()> {
    for rule in rules.rules() {
        validate_rule(rule, config)?;
    }
    Ok(())
}
