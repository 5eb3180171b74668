// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build trace: an append-only output buffer with a periodic uploader.
//!
//! Output lines are stamped with elapsed seconds. A background task pushes
//! `Running` snapshots to the server; the terminal `success`/`fail` call
//! stops the task and sends the final state, retrying transient failures.

use lw_core::{
    BuildError, BuildState, Network, RunnerConfig, TraceWrite, UpdateState, UPDATE_INTERVAL,
    UPDATE_RETRY_INTERVAL,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

struct TraceBuffer {
    text: String,
    state: BuildState,
    started: Instant,
    /// Set when the server permanently rejected an update; no further sends.
    abandoned: bool,
}

impl TraceBuffer {
    /// Append output, stamping the start of each new line with the elapsed
    /// build time.
    fn append(&mut self, text: &str) {
        for line in text.split_inclusive('\n') {
            self.text.push_str(line);
            if line.ends_with('\n') {
                let elapsed = self.started.elapsed().as_secs_f64();
                self.text.push_str(&format!("[{elapsed:.1}s] "));
            }
        }
    }
}

struct Shared {
    network: Arc<dyn Network>,
    runner: RunnerConfig,
    job_id: u64,
    buf: Mutex<TraceBuffer>,
}

/// The upstream log stream for one build.
///
/// Single writer; the uploader task only reads snapshots. Consumed by the
/// terminal [`TraceUpdater::success`] / [`TraceUpdater::fail`] call.
pub struct TraceUpdater {
    shared: Arc<Shared>,
    stop: CancellationToken,
    uploader: JoinHandle<()>,
}

impl TraceUpdater {
    /// Tell the server the job is being processed and start the uploader.
    pub async fn open(network: Arc<dyn Network>, runner: RunnerConfig, job_id: u64) -> Self {
        network.process_build(&runner, job_id).await;
        let shared = Arc::new(Shared {
            network,
            runner,
            job_id,
            buf: Mutex::new(TraceBuffer {
                text: String::new(),
                state: BuildState::Running,
                started: Instant::now(),
                abandoned: false,
            }),
        });
        let stop = CancellationToken::new();
        let uploader = tokio::spawn(upload_loop(shared.clone(), stop.clone()));
        Self { shared, stop, uploader }
    }

    /// Current trace text (tests and diagnostics).
    pub fn text(&self) -> String {
        self.shared.buf.lock().text.clone()
    }

    /// Terminal operation: the build succeeded.
    pub async fn success(self) {
        self.finish(BuildState::Success, None).await;
    }

    /// Terminal operation: the build failed with the given error.
    pub async fn fail(self, error: &BuildError) {
        self.finish(BuildState::Failed, Some(error)).await;
    }

    async fn finish(self, state: BuildState, error: Option<&BuildError>) {
        self.stop.cancel();
        // Single-flight: never two concurrent uploads for one job.
        let _ = self.uploader.await;

        let (text, abandoned) = {
            let mut buf = self.shared.buf.lock();
            if let Some(error) = error {
                buf.append(&format!("ERROR: {error}\n"));
            }
            buf.state = state;
            (buf.text.clone(), buf.abandoned)
        };
        if abandoned {
            return;
        }

        loop {
            let shared = &self.shared;
            match shared.network.update_build(&shared.runner, shared.job_id, state, &text).await {
                UpdateState::TransientFailure => tokio::time::sleep(UPDATE_RETRY_INTERVAL).await,
                UpdateState::Succeeded | UpdateState::PermanentFailure => return,
            }
        }
    }
}

impl TraceWrite for TraceUpdater {
    fn write(&mut self, text: &str) {
        self.shared.buf.lock().append(text);
    }
}

async fn upload_loop(shared: Arc<Shared>, stop: CancellationToken) {
    loop {
        tokio::select! {
            _ = stop.cancelled() => return,
            _ = tokio::time::sleep(UPDATE_INTERVAL) => {}
        }

        let (state, text) = {
            let buf = shared.buf.lock();
            (buf.state, buf.text.clone())
        };
        match shared.network.update_build(&shared.runner, shared.job_id, state, &text).await {
            UpdateState::Succeeded => {}
            UpdateState::TransientFailure => {
                tracing::debug!(job = shared.job_id, "trace upload failed, backing off");
                tokio::select! {
                    _ = stop.cancelled() => return,
                    _ = tokio::time::sleep(UPDATE_RETRY_INTERVAL) => {}
                }
            }
            UpdateState::PermanentFailure => {
                tracing::warn!(job = shared.job_id, "server rejected trace update, abandoning stream");
                shared.buf.lock().abandoned = true;
                return;
            }
        }
    }
}

#[cfg(test)]
#[path = "trace_tests.rs"]
mod tests;
