// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-runner fetch-failure tracking.
//!
//! A runner that reported unhealthy is skipped by the feeder until the
//! health window elapses, so a persistently-down endpoint is not thrashed
//! at the poll rate.

use lw_core::{Clock, HEALTH_CHECK_INTERVAL};
use parking_lot::Mutex;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
struct HealthEntry {
    failed_at: Instant,
}

/// Tracks which runners are currently failing.
///
/// An entry's presence means the runner is unhealthy; entries expire after
/// the health window, granting one free retry.
pub struct HealthTracker<C: Clock> {
    clock: C,
    interval: Duration,
    entries: Mutex<HashMap<String, HealthEntry>>,
}

impl<C: Clock> HealthTracker<C> {
    pub fn new(clock: C) -> Self {
        Self::with_interval(clock, HEALTH_CHECK_INTERVAL)
    }

    pub fn with_interval(clock: C, interval: Duration) -> Self {
        Self { clock, interval, entries: Mutex::new(HashMap::new()) }
    }

    /// Whether the runner should be polled.
    ///
    /// Returns false only while a recorded failure is younger than the
    /// health window; an aged-out entry is cleared on the way through.
    pub fn is_healthy(&self, runner_id: &str) -> bool {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get(runner_id) else {
            return true;
        };
        if self.clock.now().duration_since(entry.failed_at) < self.interval {
            return false;
        }
        entries.remove(runner_id);
        true
    }

    /// Record the health of the runner's last fetch.
    ///
    /// A failure while already unhealthy refreshes the window silently; the
    /// warning is emitted once per failure streak.
    pub fn make_healthy(&self, runner_id: &str, healthy: bool) {
        let mut entries = self.entries.lock();
        if healthy {
            entries.remove(runner_id);
            return;
        }
        match entries.entry(runner_id.to_string()) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().failed_at = self.clock.now();
            }
            Entry::Vacant(entry) => {
                tracing::warn!(runner = runner_id, "runner is not healthy, pausing polls");
                entry.insert(HealthEntry { failed_at: self.clock.now() });
            }
        }
    }

    /// Forget all failure state (config reload starts fresh).
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
