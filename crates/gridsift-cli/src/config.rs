//! CLI configuration.
//!
//! Read from the file given with `--config`, else from `gridsift.toml` in the
//! current directory when present. Every table and key is optional.

use anyhow::{Context, Result};
use gridsift_filter::EngineConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "gridsift.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GridsiftConfig {
    /// Filter engine policies
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl LoggingConfig {
    pub fn level(&self) -> Result<tracing::Level> {
        self.level
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid log level '{}' in configuration", self.level))
    }
}

pub fn parse_config(text: &str) -> Result<GridsiftConfig> {
    toml::from_str(text).context("parsing gridsift configuration")
}

/// Load the configuration. An explicit path must exist; the default file is
/// optional.
pub fn load_config(explicit: Option<&Path>) -> Result<GridsiftConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !fallback.is_file() {
                return Ok(GridsiftConfig::default());
            }
            fallback
        }
    };
    let text = fs::read_to_string(&path)
        .with_context(|| format!("reading configuration {}", path.display()))?;
    parse_config(&text).with_context(|| format!("in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridsift_filter::{MissingFilterPolicy, UnsupportedFilterPolicy};

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.engine.unsupported_filter, UnsupportedFilterPolicy::Empty);
        assert!(config.engine.parallel);
    }

    #[test]
    fn test_engine_table() {
        let config = parse_config(
            r#"
            [engine]
            unsupported_filter = "error"
            missing_nested_filter = "empty"
            parallel = false

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.engine.unsupported_filter, UnsupportedFilterPolicy::Error);
        assert_eq!(config.engine.missing_nested_filter, MissingFilterPolicy::Empty);
        assert!(!config.engine.parallel);
        assert_eq!(config.logging.level().unwrap(), tracing::Level::DEBUG);
    }

    #[test]
    fn test_bad_level_is_reported() {
        let config = parse_config("[logging]\nlevel = \"loud\"").unwrap();
        assert!(config.logging.level().is_err());
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("missing.toml"))).is_err());

        let path = dir.path().join("gridsift.toml");
        fs::write(&path, "[engine]\nparallel = false\n").unwrap();
        assert!(!load_config(Some(&path)).unwrap().engine.parallel);
    }
}
