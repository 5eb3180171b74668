// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job driver: one acquired slot, one job, end to end.
//!
//! Release discipline: the slot's executor capacity and the registry's
//! build slot are both returned on every exit path, and every error a job
//! terminates with funnels into the trace's terminal upload.

use crate::builds::BuildsRegistry;
use crate::feeder::Slot;
use crate::health::HealthTracker;
use crate::trace::TraceUpdater;
use crate::watcher::SharedConfig;
use lw_core::{Build, BuildError, BuildState, Clock, Config, Network, RunnerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct JobDriver<C: Clock> {
    network: Arc<dyn Network>,
    config: SharedConfig,
    builds: Arc<BuildsRegistry>,
    health: Arc<HealthTracker<C>>,
    abort: CancellationToken,
    clock: C,
}

/// Returns the registry slot taken in `process_slot` on every exit path.
struct CapacityGuard<'a> {
    builds: &'a BuildsRegistry,
    runner: &'a RunnerConfig,
}

impl Drop for CapacityGuard<'_> {
    fn drop(&mut self) {
        self.builds.release(self.runner);
    }
}

impl<C: Clock> JobDriver<C> {
    pub fn new(
        network: Arc<dyn Network>,
        config: SharedConfig,
        builds: Arc<BuildsRegistry>,
        health: Arc<HealthTracker<C>>,
        abort: CancellationToken,
        clock: C,
    ) -> Self {
        Self { network, config, builds, health, abort, clock }
    }

    pub fn builds_count(&self) -> usize {
        self.builds.builds_count()
    }

    /// Drive one slot: poll the runner, run the job if there is one.
    ///
    /// The slot is released on every path, including no-capacity and idle.
    pub async fn process(&self, slot: Slot) {
        self.process_slot(&slot).await;
        slot.release().await;
    }

    async fn process_slot(&self, slot: &Slot) {
        let runner = slot.runner();
        let config = self.config.get();

        if !self.builds.acquire(runner, config.concurrent) {
            // no capacity: normal, the feeder keeps producing
            return;
        }
        let _capacity = CapacityGuard { builds: self.builds.as_ref(), runner };

        let (payload, healthy) = self.network.get_build(runner).await;
        self.health.make_healthy(&runner.unique_id(), healthy);
        let Some(payload) = payload else {
            // no work, or a soft failure already recorded in the health map
            return;
        };

        tracing::info!(
            job = payload.id,
            runner = %runner.short_description(),
            builds = self.builds.builds_count() + 1,
            "processing job"
        );

        let mut trace = TraceUpdater::open(self.network.clone(), runner.clone(), payload.id).await;
        let mut build = Build::new(payload, runner.clone());

        self.builds.add_build(&mut build);
        let result = self.run_build(slot, &config, &mut build, &mut trace).await;
        self.builds.remove_build(&build);

        match result {
            Ok(()) => trace.success().await,
            Err(error) => {
                tracing::warn!(job = build.payload.id, %error, "build failed");
                trace.fail(&error).await;
            }
        }
    }

    /// The executor protocol: prepare → start → wait → finish → cleanup.
    ///
    /// On an error the remaining forward steps are skipped, but `finish`
    /// and `cleanup` always run. A cancelled wait maps to
    /// [`BuildError::Cancelled`] even if the executor misbehaves.
    async fn run_build(
        &self,
        slot: &Slot,
        config: &Config,
        build: &mut Build,
        trace: &mut TraceUpdater,
    ) -> Result<(), BuildError> {
        let mut executor = slot.provider().create();

        let root_dir = builds_root(slot.runner());
        let cache_root = cache_root(slot.runner());
        build.start(self.clock.now(), &root_dir, &cache_root, slot.runner().shared_builds_dir);

        let mut result = executor.prepare(config, slot.runner(), build, slot.data(), trace).await;
        if result.is_ok() {
            build.state = BuildState::Running;
            result = executor.start().await;
        }
        if result.is_ok() {
            let abort = self.abort.clone();
            result = tokio::select! {
                wait = executor.wait(trace, &abort) => wait,
                _ = abort.cancelled() => Err(BuildError::Cancelled),
            };
        }

        executor.finish(result.as_ref().err()).await;
        executor.cleanup().await;

        let state = if result.is_ok() { BuildState::Success } else { BuildState::Failed };
        build.finish(state, self.clock.now());
        result
    }
}

fn builds_root(runner: &RunnerConfig) -> PathBuf {
    PathBuf::from(runner.builds_dir.as_deref().unwrap_or("builds"))
}

fn cache_root(runner: &RunnerConfig) -> PathBuf {
    PathBuf::from(runner.cache_dir.as_deref().unwrap_or("cache"))
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;
