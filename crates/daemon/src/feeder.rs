// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runner feeder: turns the configured runner list into a stream of
//! acquired execution slots.

use crate::health::HealthTracker;
use crate::registry::ProviderRegistry;
use crate::supervisor::ShutdownState;
use crate::watcher::SharedConfig;
use lw_core::{Clock, ExecutorData, ExecutorProvider, RunnerConfig, CHECK_INTERVAL};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// One reserved unit of execution capacity, bound to a runner.
///
/// Every slot sent to the worker channel is released exactly once: by the
/// worker that consumed it, by the feeder when a send loses the shutdown
/// race, or by the supervisor's teardown drain.
pub struct Slot {
    runner: RunnerConfig,
    provider: Arc<dyn ExecutorProvider>,
    data: Option<ExecutorData>,
}

impl Slot {
    pub(crate) fn new(
        runner: RunnerConfig,
        provider: Arc<dyn ExecutorProvider>,
        data: ExecutorData,
    ) -> Self {
        Self { runner, provider, data: Some(data) }
    }

    pub fn runner(&self) -> &RunnerConfig {
        &self.runner
    }

    pub fn provider(&self) -> &Arc<dyn ExecutorProvider> {
        &self.provider
    }

    pub fn data(&self) -> &ExecutorData {
        match &self.data {
            Some(data) => data,
            // release() consumes the slot; no caller can observe it after
            None => unreachable!("slot data accessed after release"),
        }
    }

    /// Hand the acquisition back to its provider.
    pub async fn release(mut self) {
        if let Some(data) = self.data.take() {
            self.provider.release(&self.runner, data).await;
        }
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        if self.data.is_some() {
            tracing::warn!(
                runner = %self.runner.short_description(),
                "slot dropped without release; executor capacity leaked"
            );
        }
    }
}

/// Single long-lived producer walking the runner list every tick.
pub struct RunnerFeeder<C: Clock> {
    config: SharedConfig,
    health: Arc<HealthTracker<C>>,
    providers: Arc<ProviderRegistry>,
    shutdown: ShutdownState,
    check_interval: Duration,
}

impl<C: Clock> RunnerFeeder<C> {
    pub fn new(
        config: SharedConfig,
        health: Arc<HealthTracker<C>>,
        providers: Arc<ProviderRegistry>,
        shutdown: ShutdownState,
    ) -> Self {
        Self { config, health, providers, shutdown, check_interval: CHECK_INTERVAL }
    }

    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    /// Produce slots until shutdown is requested.
    pub async fn run(self, slots: mpsc::Sender<Slot>) {
        while !self.shutdown.is_stopping() {
            let config = self.config.get();
            tracing::debug!(runners = config.runners.len(), "feeding runners");
            for runner in &config.runners {
                self.feed_runner(runner, &slots).await;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.check_interval) => {}
                _ = self.shutdown.run_token().cancelled() => return,
            }
        }
    }

    /// Try to acquire and emit one slot for a runner.
    ///
    /// Skips quietly when the runner is unhealthy, its executor kind is not
    /// registered, or the provider's pool is exhausted. A slot whose send
    /// loses the shutdown race is released here, never abandoned.
    async fn feed_runner(&self, runner: &RunnerConfig, slots: &mpsc::Sender<Slot>) {
        if !self.health.is_healthy(&runner.unique_id()) {
            return;
        }
        let Some(provider) = self.providers.get(&runner.executor) else {
            return;
        };
        if !provider.can_create() {
            return;
        }
        let data = match provider.acquire(runner).await {
            Ok(data) => data,
            Err(error) => {
                tracing::warn!(
                    runner = %runner.short_description(),
                    executor = %runner.executor,
                    %error,
                    "failed to acquire executor for runner"
                );
                return;
            }
        };
        let slot = Slot::new(runner.clone(), provider, data);
        tokio::select! {
            permit = slots.reserve() => match permit {
                Ok(permit) => permit.send(slot),
                Err(_) => slot.release().await,
            },
            _ = self.shutdown.run_token().cancelled() => slot.release().await,
        }
    }
}

#[cfg(test)]
#[path = "feeder_tests.rs"]
mod tests;
