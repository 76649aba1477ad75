// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Runtime configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! model_path = "./models/addition.json"
//! memory_budget = "64M"
//! pool = "arena"
//! allow_pool_reentry = false
//! enable_profiling = true
//! ```

use crate::RuntimeError;
use memory_manager::{MemoryBudget, PoolOptions};
use std::fmt;
use std::path::{Path, PathBuf};

/// Which pool strategy backs tensor buffers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolKind {
    /// First-fit arena with coalescing ([`memory_manager::ArenaPool`]).
    #[default]
    Arena,
    /// Power-of-two slots ([`memory_manager::SlabPool`]).
    Slab,
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PoolKind::Arena => "arena",
            PoolKind::Slab => "slab",
        })
    }
}

impl std::str::FromStr for PoolKind {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "arena" => Ok(PoolKind::Arena),
            "slab" => Ok(PoolKind::Slab),
            other => Err(RuntimeError::ConfigError(format!(
                "unknown pool '{other}'; expected 'arena' or 'slab'"
            ))),
        }
    }
}

/// Configuration for the runtime.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RuntimeConfig {
    /// Path to the JSON model file.
    pub model_path: PathBuf,
    /// Cap on the pool reservation (human-readable, e.g. `"64M"`). Unbounded if absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_budget: Option<String>,
    /// Pool strategy.
    #[serde(default)]
    pub pool: PoolKind,
    /// Whether a released pool may be allocated again.
    #[serde(default)]
    pub allow_pool_reentry: bool,
    /// Whether to record per-node metrics.
    #[serde(default = "default_true")]
    pub enable_profiling: bool,
}

fn default_true() -> bool {
    true
}

impl RuntimeConfig {
    /// Creates a default configuration for the model at `path`.
    pub fn for_model(path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: path.into(),
            ..Default::default()
        }
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, RuntimeError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RuntimeError::ConfigError(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, RuntimeError> {
        toml::from_str(toml_str)
            .map_err(|e| RuntimeError::ConfigError(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, RuntimeError> {
        toml::to_string_pretty(self)
            .map_err(|e| RuntimeError::ConfigError(format!("TOML serialise error: {e}")))
    }

    /// Parses the memory budget string, if one is set.
    pub fn parse_budget(&self) -> Result<Option<MemoryBudget>, RuntimeError> {
        self.memory_budget
            .as_deref()
            .map(MemoryBudget::parse)
            .transpose()
            .map_err(|e| RuntimeError::ConfigError(e.to_string()))
    }

    /// Builds the options every pool is constructed with.
    pub fn pool_options(&self) -> Result<PoolOptions, RuntimeError> {
        Ok(PoolOptions {
            budget: self.parse_budget()?,
            allow_reentry: self.allow_pool_reentry,
        })
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("./model.json"),
            memory_budget: None,
            pool: PoolKind::Arena,
            allow_pool_reentry: false,
            enable_profiling: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let c = RuntimeConfig::default();
        assert_eq!(c.pool, PoolKind::Arena);
        assert!(c.memory_budget.is_none());
        assert!(!c.allow_pool_reentry);
        assert!(c.enable_profiling);
    }

    #[test]
    fn test_parse_budget() {
        let c = RuntimeConfig {
            memory_budget: Some("256M".into()),
            ..Default::default()
        };
        assert_eq!(c.parse_budget().unwrap().map(|b| b.as_mb()), Some(256));
        assert_eq!(RuntimeConfig::default().parse_budget().unwrap(), None);

        let bad = RuntimeConfig {
            memory_budget: Some("lots".into()),
            ..Default::default()
        };
        assert!(matches!(bad.parse_budget(), Err(RuntimeError::ConfigError(_))));
    }

    #[test]
    fn test_from_toml() {
        let toml = r#"
model_path = "/tmp/add.json"
memory_budget = "1M"
pool = "slab"
allow_pool_reentry = true
enable_profiling = false
"#;
        let c = RuntimeConfig::from_toml(toml).unwrap();
        assert_eq!(c.model_path, PathBuf::from("/tmp/add.json"));
        assert_eq!(c.memory_budget.as_deref(), Some("1M"));
        assert_eq!(c.pool, PoolKind::Slab);
        assert!(c.allow_pool_reentry);
        assert!(!c.enable_profiling);

        let opts = c.pool_options().unwrap();
        assert!(opts.allow_reentry);
        assert_eq!(opts.budget, Some(MemoryBudget::from_mb(1)));
    }

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let c = RuntimeConfig::from_toml(r#"model_path = "m.json""#).unwrap();
        assert_eq!(c.pool, PoolKind::Arena);
        assert!(c.enable_profiling);
    }

    #[test]
    fn test_unknown_pool_rejected() {
        let toml = r#"
model_path = "m.json"
pool = "buddy"
"#;
        assert!(RuntimeConfig::from_toml(toml).is_err());
        assert!("buddy".parse::<PoolKind>().is_err());
        assert_eq!("SLAB".parse::<PoolKind>().unwrap(), PoolKind::Slab);
    }

    #[test]
    fn test_to_toml_roundtrip() {
        let c = RuntimeConfig {
            memory_budget: Some("8K".into()),
            pool: PoolKind::Slab,
            ..Default::default()
        };
        let toml = c.to_toml().unwrap();
        let back = RuntimeConfig::from_toml(&toml).unwrap();
        assert_eq!(back.pool, PoolKind::Slab);
        assert_eq!(back.memory_budget, c.memory_budget);
    }
}
