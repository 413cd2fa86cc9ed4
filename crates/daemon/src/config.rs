// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tender.toml` loading and validation

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tender_core::{CloudConfig, TemplateError};
use thiserror::Error;

/// Config file name under the user's config directory
pub const CONFIG_FILE: &str = "tender/tender.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no config file given and no config directory found")]
    NoConfigPath,
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("config defines no clouds")]
    NoClouds,
    #[error("cloud name must not be empty")]
    UnnamedCloud,
    #[error("duplicate cloud name {0:?}")]
    DuplicateCloud(String),
    #[error("cloud {cloud}: {source}")]
    Template {
        cloud: String,
        #[source]
        source: TemplateError,
    },
}

/// Top-level daemon configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TenderConfig {
    #[serde(default, rename = "cloud")]
    pub clouds: Vec<CloudConfig>,
}

impl TenderConfig {
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: TenderConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.clouds.is_empty() {
            return Err(ConfigError::NoClouds);
        }
        let mut seen = HashSet::new();
        for cloud in &self.clouds {
            if cloud.name.trim().is_empty() {
                return Err(ConfigError::UnnamedCloud);
            }
            if !seen.insert(cloud.name.as_str()) {
                return Err(ConfigError::DuplicateCloud(cloud.name.clone()));
            }
            for template in &cloud.templates {
                template
                    .validate()
                    .map_err(|source| ConfigError::Template { cloud: cloud.name.clone(), source })?;
            }
        }
        Ok(())
    }
}

/// Read and validate the config at `path`
pub fn load(path: &Path) -> Result<TenderConfig, ConfigError> {
    let text = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
    TenderConfig::parse(&text)
}

/// Config path: `--config` > `TENDER_CONFIG` > `<config_dir>/tender/tender.toml`
pub fn resolve_path(cli: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = cli {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = crate::env::config_path() {
        return Ok(path);
    }
    dirs::config_dir().map(|dir| dir.join(CONFIG_FILE)).ok_or(ConfigError::NoConfigPath)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
