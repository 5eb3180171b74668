// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared config holder and the reload watcher.
//!
//! Readers take an `Arc` snapshot; a reload swaps the pointer atomically so
//! nobody ever observes a torn config.

use crate::health::HealthTracker;
use lw_core::{Clock, Config, ConfigError};
use parking_lot::{Mutex, RwLock};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

/// The active configuration, shared across the supervisor.
#[derive(Clone)]
pub struct SharedConfig {
    inner: Arc<RwLock<Arc<Config>>>,
}

impl SharedConfig {
    pub fn new(config: Config) -> Self {
        Self { inner: Arc::new(RwLock::new(Arc::new(config))) }
    }

    /// Snapshot of the current config.
    pub fn get(&self) -> Arc<Config> {
        self.inner.read().clone()
    }

    fn set(&self, config: Config) {
        *self.inner.write() = Arc::new(config);
    }
}

/// Reloads the config file on demand and when its mtime advances.
pub struct ConfigWatcher<C: Clock> {
    path: PathBuf,
    config: SharedConfig,
    health: Arc<HealthTracker<C>>,
    user_override: Option<String>,
    /// Mtime of the last load attempt, successful or not. A broken file is
    /// not retried until it changes again.
    last_mod_time: Mutex<Option<SystemTime>>,
}

impl<C: Clock> ConfigWatcher<C> {
    pub fn new(
        path: PathBuf,
        config: SharedConfig,
        health: Arc<HealthTracker<C>>,
        user_override: Option<String>,
    ) -> Self {
        let last_mod_time = Mutex::new(config.get().mod_time);
        Self { path, config, health, user_override, last_mod_time }
    }

    /// Periodic tick: reload when the file is strictly newer than the last
    /// load attempt.
    pub fn check(&self) {
        let modified = match fs::metadata(&self.path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(error) => {
                tracing::warn!(path = %self.path.display(), %error, "failed to stat config file");
                return;
            }
        };
        let stale = match *self.last_mod_time.lock() {
            Some(last) => modified > last,
            None => true,
        };
        if !stale {
            return;
        }
        if self.reload().is_err() {
            *self.last_mod_time.lock() = Some(modified);
        }
    }

    /// Unconditional reload (explicit reload signal).
    ///
    /// On failure the prior config stays active. On success the active
    /// config is swapped and all runner health state starts fresh.
    pub fn reload(&self) -> Result<(), ConfigError> {
        match Config::load(&self.path) {
            Ok(mut config) => {
                if let Some(user) = &self.user_override {
                    config.user = Some(user.clone());
                }
                *self.last_mod_time.lock() = config.mod_time;
                tracing::info!(
                    concurrent = config.concurrent,
                    runners = config.runners.len(),
                    "config loaded"
                );
                self.config.set(config);
                self.health.clear();
                Ok(())
            }
            Err(error) => {
                tracing::error!(path = %self.path.display(), %error, "failed to load config");
                Err(error)
            }
        }
    }
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
