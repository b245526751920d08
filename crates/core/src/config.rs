//! TOML-based configuration for checksync.
//!
//! Every section is optional and falls back to sensible defaults, so the
//! tool runs without any config file at all. The mapping tables feed
//! [`crate::mapping::ConfiguredMapping`]; the sanitizer choice selects the
//! text hook applied before parsing.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level application configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,

    /// Sync behaviour settings.
    #[serde(default)]
    pub sync: SyncSettings,

    /// Status / priority mapping tables.
    #[serde(default)]
    pub mapping: MappingConfig,
}

impl AppConfig {
    /// Load the configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        info!(path = %path.display(), "loading configuration");
        let contents = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field consistency after parsing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mapping.priorities.len() == 1 {
            return Err(ConfigError::InvalidValue {
                field: "mapping.priorities".into(),
                detail: "a priority ladder needs at least a none-level and one priority".into(),
            });
        }

        debug!("configuration validated");
        Ok(())
    }

    /// Default configuration file contents for `checksync init`.
    pub fn default_toml() -> &'static str {
        r#"# checksync configuration
# Every section is optional; omitted values fall back to built-in defaults.

[log]
level = "info"

[sync]
# Text sanitizer applied before parsing: "passthrough" or "bmp"
# ("bmp" replaces characters outside the Basic Multilingual Plane).
sanitizer = "passthrough"

[mapping]
# Priority ladder; the position within the ladder is the priority id and
# position 0 means "no priority".
priorities = ["None", "Highest", "High", "Normal", "Low", "Lowest"]

# Status style key -> display name.
[mapping.status]
blocked = "Blocked"
inProgress = "In Progress"
notApplicable = "N/A"
"#
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sync behaviour
// ---------------------------------------------------------------------------

/// Which text sanitizer runs before parsing.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SanitizerKind {
    /// No transformation.
    #[default]
    Passthrough,
    /// Replace characters outside the Basic Multilingual Plane.
    Bmp,
}

/// Sync behaviour settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncSettings {
    #[serde(default)]
    pub sanitizer: SanitizerKind,
}

// ---------------------------------------------------------------------------
// Mapping tables
// ---------------------------------------------------------------------------

/// Status / priority mapping tables. Empty tables mean "use the built-in
/// defaults" (see [`crate::mapping`]).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingConfig {
    /// Status style key -> display name.
    #[serde(default)]
    pub status: BTreeMap<String, String>,

    /// Priority names in ladder order; index 0 means "no priority".
    #[serde(default)]
    pub priorities: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_toml_parses() {
        let config: AppConfig = toml::from_str(AppConfig::default_toml()).expect("valid template");
        assert_eq!(config.log.level, "info");
        assert_eq!(config.sync.sanitizer, SanitizerKind::Passthrough);
        assert_eq!(config.mapping.priorities.len(), 6);
        assert_eq!(
            config.mapping.status.get("blocked").map(String::as_str),
            Some("Blocked")
        );
        config.validate().expect("template is valid");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").expect("empty config is fine");
        assert_eq!(config.log.level, "info");
        assert!(config.mapping.status.is_empty());
        config.validate().expect("defaults are valid");
    }

    #[test]
    fn test_missing_file() {
        let err = AppConfig::load_from_file(Path::new("/nonexistent/checksync.toml"));
        assert!(matches!(err, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_invalid_priority_ladder() {
        let config: AppConfig =
            toml::from_str("[mapping]\npriorities = [\"None\"]\n").expect("parses");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[log]\nlevel = \"debug\"\n").expect("write config");

        let config = AppConfig::load_from_file(&path).expect("loads");
        assert_eq!(config.log.level, "debug");
    }
}
