// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runner configuration: one pollable job endpoint.

use crate::variables::{Variable, Variables};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Returns a prefix of at most `n` characters.
///
/// Counts characters, not bytes, so arbitrary user-supplied strings (runner
/// tokens are not required to be ASCII) never split a multi-byte character.
pub fn short(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((index, _)) => &s[..index],
        None => s,
    }
}

/// User-supplied description of one runner endpoint.
///
/// Immutable once loaded; a config reload replaces the whole set. Identity
/// for health and slot bookkeeping is [`RunnerConfig::unique_id`], not the
/// display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    #[serde(default)]
    pub name: String,
    pub url: String,
    pub token: String,
    pub executor: String,
    /// Per-runner concurrency limit; 0 means no limit.
    #[serde(default)]
    pub limit: usize,
    #[serde(default)]
    pub labels: Vec<String>,
    /// `KEY=VALUE` environment overrides injected into every build.
    #[serde(default)]
    pub environment: Vec<String>,
    #[serde(default)]
    pub builds_dir: Option<String>,
    /// Whether the builds directory is shared with other runners on the
    /// host; shared layouts get a per-runner, per-concurrency prefix.
    #[serde(default)]
    pub shared_builds_dir: bool,
    #[serde(default)]
    pub cache_dir: Option<String>,
    #[serde(default)]
    pub shell: Option<String>,
}

impl RunnerConfig {
    /// Stable identity: first 8 hex characters of `Sha256(url + token)`.
    pub fn unique_id(&self) -> String {
        let digest = Sha256::digest(format!("{}{}", self.url, self.token).as_bytes());
        let hex = format!("{:x}", digest);
        short(&hex, 8).to_string()
    }

    /// Log-safe handle: the first 8 characters of the token.
    pub fn short_description(&self) -> &str {
        short(&self.token, 8)
    }

    /// The `environment` entries as build variables; malformed entries are
    /// dropped.
    pub fn variables(&self) -> Variables {
        self.environment.iter().filter_map(|e| Variable::from_entry(e)).collect()
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
