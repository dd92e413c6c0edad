// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Engine configuration

use crate::ast::Reducer;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file, looked up in the working directory
pub const CONFIG_FILE: &str = "eqkernel.toml";

/// Factory and equation defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Create free arguments for unresolved names in `Factory::make`
    pub build_args: bool,
    /// Reducer for `combine=True` and for multi-entry equation results
    pub combine: Reducer,
    /// Register the built-in function table
    pub builtins: bool,
    /// Register `pi` and `e`
    pub constants: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            build_args: true,
            combine: Reducer::Sum,
            builtins: true,
            constants: true,
        }
    }
}

impl EngineConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: EngineConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn load() -> Result<Self> {
        let mut config = if PathBuf::from(CONFIG_FILE).exists() {
            Self::from_file(CONFIG_FILE)?
        } else {
            Self::default()
        };

        if let Ok(build_args) = std::env::var("EQKERNEL_BUILD_ARGS") {
            config.build_args = build_args.parse().unwrap_or(config.build_args);
        }

        if let Ok(combine) = std::env::var("EQKERNEL_COMBINE") {
            config.combine = combine
                .parse()
                .with_context(|| format!("Invalid EQKERNEL_COMBINE: {}", combine))?;
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_partial_file_keeps_defaults() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "combine = \"mean\"")?;

        let config = EngineConfig::from_file(file.path())?;
        assert_eq!(config.combine, Reducer::Mean);
        assert!(config.build_args && config.builtins && config.constants);
        Ok(())
    }

    #[test]
    fn test_save_and_reload() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(CONFIG_FILE);
        let config = EngineConfig {
            build_args: false,
            combine: Reducer::Max,
            ..EngineConfig::default()
        };
        config.save(&path)?;
        assert_eq!(EngineConfig::from_file(&path)?, config);
        Ok(())
    }

    #[test]
    fn test_unknown_reducer_is_rejected() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "combine = \"median\"")?;
        assert!(EngineConfig::from_file(file.path()).is_err());
        Ok(())
    }
}
