// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executor contracts: the per-kind provider that hands out execution
//! capacity and the per-build state machine that runs one job.

use crate::build::Build;
use crate::config::Config;
use crate::network::TraceWrite;
use crate::runner::RunnerConfig;
use async_trait::async_trait;
use std::any::Any;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Opaque per-acquisition token.
///
/// Owned exclusively by the slot that acquired it and handed back to its
/// provider on exactly one path. Backends downcast to their own type.
pub type ExecutorData = Box<dyn Any + Send + Sync>;

/// Errors a build can terminate with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// Transient: the executor pool is exhausted; retry the runner later.
    #[error("no free executor slot")]
    NoFreeExecutor,

    /// The abort signal was observed while the build was running.
    #[error("build cancelled")]
    Cancelled,

    /// The build itself failed: setup error or non-zero user command.
    #[error("{0}")]
    Failed(String),
}

impl BuildError {
    pub fn failed(message: impl Into<String>) -> Self {
        BuildError::Failed(message.into())
    }

    /// Transient errors leave the runner healthy and are retried later.
    pub fn is_transient(&self) -> bool {
        matches!(self, BuildError::NoFreeExecutor)
    }
}

/// Factory for one executor kind.
///
/// Providers are registered at startup and looked up by the string kind in
/// each runner's config. `acquire`/`release` bracket shared-resource
/// reservation (e.g. a container slot); the feeder never emits a slot
/// without a successful `acquire`.
#[async_trait]
pub trait ExecutorProvider: Send + Sync {
    /// Advisory check: can this provider currently create an executor?
    fn can_create(&self) -> bool;

    /// Reserve shared resources for one build on this runner.
    async fn acquire(&self, runner: &RunnerConfig) -> Result<ExecutorData, BuildError>;

    /// Return resources reserved by [`ExecutorProvider::acquire`].
    ///
    /// Called exactly once per successful acquire, whether or not a build
    /// ran on the slot.
    async fn release(&self, runner: &RunnerConfig, data: ExecutorData);

    /// Create a fresh executor for one build.
    fn create(&self) -> Box<dyn Executor>;
}

/// The per-build execution state machine.
///
/// Transitions are linear: prepare → start → wait → finish → cleanup. On an
/// error the driver jumps straight to `finish` with the error preserved, but
/// `cleanup` still runs exactly once per `prepare`.
#[async_trait]
pub trait Executor: Send {
    /// Set up the build environment.
    ///
    /// `Err(BuildError::NoFreeExecutor)` is transient (retry the runner
    /// later); any other error is fatal for this job only.
    async fn prepare(
        &mut self,
        config: &Config,
        runner: &RunnerConfig,
        build: &mut Build,
        data: &ExecutorData,
        trace: &mut (dyn TraceWrite + Send),
    ) -> Result<(), BuildError>;

    /// Begin job execution.
    async fn start(&mut self) -> Result<(), BuildError>;

    /// Block until the job terminates or `abort` fires.
    ///
    /// Implementations must observe `abort` and return
    /// `Err(BuildError::Cancelled)` promptly once it is cancelled.
    async fn wait(
        &mut self,
        trace: &mut (dyn TraceWrite + Send),
        abort: &CancellationToken,
    ) -> Result<(), BuildError>;

    /// Record the terminal status. Never skipped.
    async fn finish(&mut self, error: Option<&BuildError>);

    /// Release all non-shared resources. Runs exactly once per `prepare`.
    async fn cleanup(&mut self);
}
