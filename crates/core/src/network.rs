// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Network contract to the job servers, and the trace sink builds write to.

use crate::build::{BuildState, JobPayload};
use crate::runner::RunnerConfig;
use async_trait::async_trait;
use std::fmt;

/// Outcome of a state/trace upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    Succeeded,
    /// Worth retrying after a backoff.
    TransientFailure,
    /// The server rejected the update; stop sending.
    PermanentFailure,
}

impl fmt::Display for UpdateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UpdateState::Succeeded => "succeeded",
            UpdateState::TransientFailure => "transient failure",
            UpdateState::PermanentFailure => "permanent failure",
        })
    }
}

/// Client to a runner's job server.
///
/// The concrete HTTP client lives outside this workspace; the supervisor
/// only depends on this trait.
#[async_trait]
pub trait Network: Send + Sync {
    /// Ask the runner's server for a new job.
    ///
    /// `(None, true)` means no work; `(None, false)` means the endpoint is
    /// unhealthy and should be backed off.
    async fn get_build(&self, runner: &RunnerConfig) -> (Option<JobPayload>, bool);

    /// Tell the server the job is being processed; opens the trace stream.
    async fn process_build(&self, runner: &RunnerConfig, job_id: u64);

    /// Upload the current state and full trace text for a job.
    async fn update_build(
        &self,
        runner: &RunnerConfig,
        job_id: u64,
        state: BuildState,
        trace: &str,
    ) -> UpdateState;
}

/// Append-only sink for build output.
///
/// Thread-compatible, single writer; the daemon's trace updater implements
/// this over its upload buffer.
pub trait TraceWrite: Send {
    fn write(&mut self, text: &str);
}
