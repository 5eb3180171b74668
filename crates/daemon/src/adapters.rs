// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stand-in adapters for builds without a real job-server client.

use async_trait::async_trait;
use lw_core::{BuildState, JobPayload, Network, RunnerConfig, UpdateState};

/// Network stand-in that reports no work for every runner.
///
/// Wired in when no job-server client is linked into the binary: the
/// daemon runs, polls and shuts down normally, it just never receives a
/// job.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNetwork;

#[async_trait]
impl Network for NoopNetwork {
    async fn get_build(&self, _runner: &RunnerConfig) -> (Option<JobPayload>, bool) {
        (None, true)
    }

    async fn process_build(&self, _runner: &RunnerConfig, _job_id: u64) {}

    async fn update_build(
        &self,
        _runner: &RunnerConfig,
        _job_id: u64,
        _state: BuildState,
        _trace: &str,
    ) -> UpdateState {
        UpdateState::Succeeded
    }
}
