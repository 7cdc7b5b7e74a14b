//! Engine policies.

use serde::{Deserialize, Serialize};

/// What to do with a filter that cannot select the requested kind (script
/// filters, criteria forms written for another kind, kinds without criteria).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnsupportedFilterPolicy {
    /// Select nothing
    #[default]
    Empty,
    /// Fail with `UnsupportedFilter`
    Error,
}

/// What to do when a FILTER_UUID leaf references an unknown filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingFilterPolicy {
    /// Fail with `MissingNestedFilter`
    #[default]
    Error,
    /// Treat the missing filter as selecting nothing
    Empty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub unsupported_filter: UnsupportedFilterPolicy,
    #[serde(default)]
    pub missing_nested_filter: MissingFilterPolicy,
    /// Evaluate candidates on the rayon pool (needs the `parallel` feature)
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

fn default_parallel() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            unsupported_filter: UnsupportedFilterPolicy::default(),
            missing_nested_filter: MissingFilterPolicy::default(),
            parallel: default_parallel(),
        }
    }
}

impl EngineConfig {
    pub fn strict() -> Self {
        Self {
            unsupported_filter: UnsupportedFilterPolicy::Error,
            ..Self::default()
        }
    }

    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.unsupported_filter, UnsupportedFilterPolicy::Empty);
        assert_eq!(config.missing_nested_filter, MissingFilterPolicy::Error);
        assert!(config.parallel);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "missing_nested_filter": "empty" }"#).unwrap();
        assert_eq!(config.missing_nested_filter, MissingFilterPolicy::Empty);
        assert_eq!(config.unsupported_filter, UnsupportedFilterPolicy::Empty);
        assert!(config.parallel);
    }
}
