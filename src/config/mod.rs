//! Configuration module for user-props
//!
//! This module holds the engine limits applied to every snippet and the
//! settings of the expression evaluator. Every field has a default, so an
//! empty file (or no file at all) yields a working configuration.
//!
//! # File Format
//!
//! ```toml
//! [scripting]
//! max_operations = 100000
//! timeout_ms = 250
//!
//! [evaluation]
//! max_passes = 16
//! ```
//!
//! # Example
//!
//! ```ignore
//! use user_props::config::PropsConfig;
//!
//! let config = PropsConfig::load("user-props.toml")?;
//! let pipeline = PropsPipeline::new(config);
//! ```

use crate::error::{PropsError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default operation budget per snippet run
pub const DEFAULT_MAX_OPERATIONS: u64 = 100_000;

/// Default wall-clock deadline per snippet run in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 250;

/// Default ceiling on expression re-evaluation passes
pub const DEFAULT_MAX_PASSES: usize = 16;

// ==================== Script Limits ====================

/// Resource limits applied to every snippet run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptLimits {
    /// Operation budget; exceeding it aborts the run as runaway
    #[serde(default = "default_max_operations")]
    pub max_operations: u64,

    /// Wall-clock deadline in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum function call nesting
    #[serde(default = "default_max_call_levels")]
    pub max_call_levels: usize,

    /// Maximum expression nesting depth
    #[serde(default = "default_max_expr_depth")]
    pub max_expr_depth: usize,

    /// Maximum string length produced by a script
    #[serde(default = "default_max_container_size")]
    pub max_string_size: usize,

    /// Maximum array length produced by a script
    #[serde(default = "default_max_collection_size")]
    pub max_array_size: usize,

    /// Maximum map size produced by a script
    #[serde(default = "default_max_collection_size")]
    pub max_map_size: usize,
}

fn default_max_operations() -> u64 {
    DEFAULT_MAX_OPERATIONS
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_max_call_levels() -> usize {
    32
}

fn default_max_expr_depth() -> usize {
    64
}

fn default_max_container_size() -> usize {
    10_000
}

fn default_max_collection_size() -> usize {
    1_000
}

impl Default for ScriptLimits {
    fn default() -> Self {
        Self {
            max_operations: default_max_operations(),
            timeout_ms: default_timeout_ms(),
            max_call_levels: default_max_call_levels(),
            max_expr_depth: default_max_expr_depth(),
            max_string_size: default_max_container_size(),
            max_array_size: default_max_collection_size(),
            max_map_size: default_max_collection_size(),
        }
    }
}

// ==================== Evaluation Settings ====================

/// Settings of the expression evaluator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSettings {
    /// Full passes before giving up on convergence
    #[serde(default = "default_max_passes")]
    pub max_passes: usize,
}

fn default_max_passes() -> usize {
    DEFAULT_MAX_PASSES
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            max_passes: default_max_passes(),
        }
    }
}

// ==================== Props Config ====================

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropsConfig {
    #[serde(default)]
    pub scripting: ScriptLimits,

    #[serde(default)]
    pub evaluation: EvaluationSettings,
}

impl PropsConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| PropsError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PropsError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        Self::from_toml_str(&content)
    }

    /// Load a config file, returning defaults if any error occurs
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save config to disk as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = toml::to_string_pretty(self)
            .map_err(|e| PropsError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            PropsError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }

    /// Reject values that would disable evaluation entirely
    pub fn validate(&self) -> Result<()> {
        if self.scripting.max_operations == 0 {
            return Err(PropsError::Config(
                "scripting.max_operations must be greater than 0".to_string(),
            ));
        }
        if self.scripting.timeout_ms == 0 {
            return Err(PropsError::Config(
                "scripting.timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.evaluation.max_passes == 0 {
            return Err(PropsError::Config(
                "evaluation.max_passes must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_default() {
        let config = PropsConfig::default();
        assert_eq!(config.scripting.max_operations, 100_000);
        assert_eq!(config.scripting.timeout_ms, 250);
        assert_eq!(config.scripting.max_call_levels, 32);
        assert_eq!(config.evaluation.max_passes, 16);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = PropsConfig::from_toml_str("").unwrap();
        assert_eq!(config, PropsConfig::default());
    }

    #[test]
    fn test_partial_document() {
        let config = PropsConfig::from_toml_str("[scripting]\ntimeout_ms = 50\n").unwrap();
        assert_eq!(config.scripting.timeout_ms, 50);
        assert_eq!(config.scripting.max_operations, DEFAULT_MAX_OPERATIONS);
        assert_eq!(config.evaluation.max_passes, DEFAULT_MAX_PASSES);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = PropsConfig::from_toml_str("[scripting]\nmax_operations = 0\n").unwrap_err();
        assert!(matches!(err, PropsError::Config(_)));
        assert!(PropsConfig::from_toml_str("[evaluation]\nmax_passes = 0\n").is_err());
        assert!(PropsConfig::from_toml_str("[scripting]\ntimeout_ms = \"soon\"\n").is_err());
    }

    #[test]
    fn test_load_and_save() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[evaluation]\nmax_passes = 4").unwrap();

        let config = PropsConfig::load(file.path()).unwrap();
        assert_eq!(config.evaluation.max_passes, 4);

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("saved.toml");
        config.save(&out).unwrap();
        assert_eq!(PropsConfig::load(&out).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file() {
        let err = PropsConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
        assert_eq!(
            PropsConfig::load_or_default("/definitely/not/here.toml"),
            PropsConfig::default()
        );
    }
}
