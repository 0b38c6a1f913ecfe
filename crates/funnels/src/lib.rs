//! Funnels — named filtered views over ad-performance records.
//!
//! A funnel owns a rule set (a flat rule list under implicit AND, or a
//! single AND/OR group); the filter engine decides per record whether it
//! belongs to the funnel.

pub mod engine;
pub mod funnel;
pub mod rules;

pub use engine::{matches, validate_rule, validate_rules, CompiledRuleSet};
pub use funnel::{Funnel, FunnelRegistry};
pub use rules::{FilterField, FilterGroup, FilterOperator, FilterRule, GroupLogic, RuleSet};
