use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `ADPULSE__` and optional config files.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub formula: FormulaConfig,
    #[serde(default)]
    pub filters: FilterConfig,
}

/// Budgets for parsing and evaluating user-authored metric formulas.
/// Formulas are untrusted input re-evaluated on every render, so every
/// stage is bounded.
#[derive(Debug, Clone, Deserialize)]
pub struct FormulaConfig {
    #[serde(default = "default_max_nodes")]
    pub max_nodes: usize,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
    /// Upper bound on the compiled size of a user-supplied regex pattern.
    #[serde(default = "default_regex_size_limit")]
    pub regex_size_limit_bytes: usize,
}

// Default functions
fn default_max_nodes() -> usize {
    512
}
fn default_max_depth() -> usize {
    32
}
fn default_max_steps() -> usize {
    10_000
}
fn default_regex_size_limit() -> usize {
    1 << 20
}

impl Default for FormulaConfig {
    fn default() -> Self {
        Self {
            max_nodes: default_max_nodes(),
            max_depth: default_max_depth(),
            max_steps: default_max_steps(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            regex_size_limit_bytes: default_regex_size_limit(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            formula: FormulaConfig::default(),
            filters: FilterConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("ADPULSE")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_bounded() {
        let cfg = AppConfig::default();
        assert!(cfg.formula.max_nodes > 0);
        assert!(cfg.formula.max_depth > 0);
        assert!(cfg.formula.max_steps >= cfg.formula.max_nodes);
        assert!(cfg.filters.regex_size_limit_bytes > 0);
    }
}
