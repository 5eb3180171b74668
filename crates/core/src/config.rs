// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent configuration: the TOML config file plus process-wide intervals.

use crate::runner::RunnerConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use thiserror::Error;

/// Delay between runner poll rounds in the feeder.
pub const CHECK_INTERVAL: Duration = Duration::from_secs(3);

/// Delay between config file mtime checks.
pub const RELOAD_CONFIG_INTERVAL: Duration = Duration::from_secs(3);

/// How long an unhealthy runner is skipped before it gets one free retry.
pub const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(3600);

/// Period of the build trace uploader.
pub const UPDATE_INTERVAL: Duration = Duration::from_secs(3);

/// Backoff after a transient trace-upload failure.
pub const UPDATE_RETRY_INTERVAL: Duration = Duration::from_secs(3);

/// Deadline for the forced-shutdown phase.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

fn default_concurrent() -> usize {
    1
}

/// The loaded configuration file.
///
/// Replaced wholesale on reload; readers hold an `Arc` snapshot and never
/// observe a torn config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Global cap on concurrently running builds.
    #[serde(default = "default_concurrent")]
    pub concurrent: usize,
    /// User to execute build scripts as (executor backends interpret this).
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub runners: Vec<RunnerConfig>,
    /// Modification time of the file this config was loaded from.
    #[serde(skip)]
    pub mod_time: Option<SystemTime>,
}

impl Default for Config {
    fn default() -> Self {
        Self { concurrent: default_concurrent(), user: None, runners: Vec::new(), mod_time: None }
    }
}

impl Config {
    /// Load and parse the config file, recording its mtime.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let mut config: Config = toml::from_str(&text)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        config.mod_time = fs::metadata(path).ok().and_then(|m| m.modified().ok());
        Ok(config)
    }

    /// Per-runner limit with the "0 means unbounded" rule applied.
    pub fn runner_limit(runner: &RunnerConfig) -> usize {
        if runner.limit == 0 {
            usize::MAX
        } else {
            runner.limit
        }
    }
}

/// Config load failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to parse config {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
