// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared stubs for supervisor tests: scripted network, counting provider,
//! journaling executor.

use async_trait::async_trait;
use lw_core::{
    Build, BuildError, BuildState, Config, Executor, ExecutorData, ExecutorProvider, JobPayload,
    Network, RunnerConfig, TraceWrite, UpdateState,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub(crate) fn test_runner(token: &str, executor: &str, limit: usize) -> RunnerConfig {
    RunnerConfig {
        name: format!("runner-{token}"),
        url: "https://ci.example.com".into(),
        token: token.into(),
        executor: executor.into(),
        limit,
        labels: vec![],
        environment: vec![],
        builds_dir: None,
        shared_builds_dir: false,
        cache_dir: None,
        shell: None,
    }
}

pub(crate) fn test_config(concurrent: usize, runners: Vec<RunnerConfig>) -> Config {
    Config { concurrent, user: None, runners, mod_time: None }
}

pub(crate) fn test_payload(id: u64) -> JobPayload {
    JobPayload {
        id,
        project_id: 1,
        name: "widget".into(),
        commands: vec!["echo hi".into()],
        repo_url: "https://git.example.com/group/widget.git".into(),
        ref_name: "main".into(),
        sha: "deadbeef".into(),
        ..JobPayload::default()
    }
}

/// Network stub with a scripted queue of `get_build` responses.
///
/// Once the queue is drained every poll returns the default `(None, true)`
/// idle answer. All uploads are recorded.
pub(crate) struct StubNetwork {
    responses: Mutex<VecDeque<(Option<JobPayload>, bool)>>,
    update_results: Mutex<VecDeque<UpdateState>>,
    pub updates: Mutex<Vec<(u64, BuildState, String)>>,
    pub processed: Mutex<Vec<u64>>,
    pub polls: AtomicUsize,
}

impl StubNetwork {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            update_results: Mutex::new(VecDeque::new()),
            updates: Mutex::new(Vec::new()),
            processed: Mutex::new(Vec::new()),
            polls: AtomicUsize::new(0),
        }
    }

    pub fn push_response(&self, payload: Option<JobPayload>, healthy: bool) {
        self.responses.lock().push_back((payload, healthy));
    }

    pub fn push_update_result(&self, result: UpdateState) {
        self.update_results.lock().push_back(result);
    }

    /// The trace text of the most recent upload for `job_id`.
    pub fn last_trace(&self, job_id: u64) -> Option<String> {
        self.updates
            .lock()
            .iter()
            .rev()
            .find(|(id, _, _)| *id == job_id)
            .map(|(_, _, text)| text.clone())
    }

    /// The state of the most recent upload for `job_id`.
    pub fn last_state(&self, job_id: u64) -> Option<BuildState> {
        self.updates.lock().iter().rev().find(|(id, _, _)| *id == job_id).map(|(_, s, _)| *s)
    }
}

#[async_trait]
impl Network for StubNetwork {
    async fn get_build(&self, _runner: &RunnerConfig) -> (Option<JobPayload>, bool) {
        self.polls.fetch_add(1, Ordering::SeqCst);
        self.responses.lock().pop_front().unwrap_or((None, true))
    }

    async fn process_build(&self, _runner: &RunnerConfig, job_id: u64) {
        self.processed.lock().push(job_id);
    }

    async fn update_build(
        &self,
        _runner: &RunnerConfig,
        job_id: u64,
        state: BuildState,
        trace: &str,
    ) -> UpdateState {
        self.updates.lock().push((job_id, state, trace.to_string()));
        self.update_results.lock().pop_front().unwrap_or(UpdateState::Succeeded)
    }
}

/// Behavior script for [`StubExecutor`].
#[derive(Clone, Default)]
pub(crate) struct ExecPlan {
    pub prepare_error: Option<BuildError>,
    pub start_error: Option<BuildError>,
    pub wait_error: Option<BuildError>,
    /// `wait` blocks until the abort token fires, then reports cancelled.
    pub wait_forever: bool,
    /// Lines written to the trace during `wait`.
    pub wait_output: Vec<String>,
    /// `cleanup` never returns (shutdown-timeout tests).
    pub hang_cleanup: bool,
}

/// Executor stub that journals its protocol transitions.
pub(crate) struct StubExecutor {
    plan: ExecPlan,
    journal: Arc<Mutex<Vec<String>>>,
    build_dirs: Arc<Mutex<Vec<std::path::PathBuf>>>,
}

#[async_trait]
impl Executor for StubExecutor {
    async fn prepare(
        &mut self,
        _config: &Config,
        _runner: &RunnerConfig,
        build: &mut Build,
        _data: &ExecutorData,
        trace: &mut (dyn TraceWrite + Send),
    ) -> Result<(), BuildError> {
        self.journal.lock().push("prepare".into());
        self.build_dirs.lock().push(build.build_dir.clone());
        trace.write("Preparing build environment\n");
        match self.plan.prepare_error.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn start(&mut self) -> Result<(), BuildError> {
        self.journal.lock().push("start".into());
        match self.plan.start_error.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn wait(
        &mut self,
        trace: &mut (dyn TraceWrite + Send),
        abort: &CancellationToken,
    ) -> Result<(), BuildError> {
        self.journal.lock().push("wait".into());
        for line in &self.plan.wait_output {
            trace.write(line);
        }
        if self.plan.wait_forever {
            abort.cancelled().await;
            return Err(BuildError::Cancelled);
        }
        match self.plan.wait_error.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn finish(&mut self, error: Option<&BuildError>) {
        let entry = match error {
            Some(err) => format!("finish:{err}"),
            None => "finish:ok".into(),
        };
        self.journal.lock().push(entry);
    }

    async fn cleanup(&mut self) {
        self.journal.lock().push("cleanup".into());
        if self.plan.hang_cleanup {
            std::future::pending::<()>().await;
        }
    }
}

/// Provider stub counting acquire/release pairs.
pub(crate) struct StubProvider {
    can_create: AtomicBool,
    fail_acquire: AtomicBool,
    pub acquired: AtomicUsize,
    pub released: AtomicUsize,
    pub plan: Mutex<ExecPlan>,
    pub journal: Arc<Mutex<Vec<String>>>,
    /// Build directories observed by executors at prepare time.
    pub build_dirs: Arc<Mutex<Vec<std::path::PathBuf>>>,
}

impl StubProvider {
    pub fn new() -> Self {
        Self {
            can_create: AtomicBool::new(true),
            fail_acquire: AtomicBool::new(false),
            acquired: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
            plan: Mutex::new(ExecPlan::default()),
            journal: Arc::new(Mutex::new(Vec::new())),
            build_dirs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_plan(plan: ExecPlan) -> Self {
        let provider = Self::new();
        *provider.plan.lock() = plan;
        provider
    }

    pub fn set_can_create(&self, value: bool) {
        self.can_create.store(value, Ordering::SeqCst);
    }

    pub fn set_fail_acquire(&self, value: bool) {
        self.fail_acquire.store(value, Ordering::SeqCst);
    }

    /// Slots acquired and not yet released.
    pub fn outstanding(&self) -> usize {
        self.acquired.load(Ordering::SeqCst) - self.released.load(Ordering::SeqCst)
    }

    pub fn journal_entries(&self) -> Vec<String> {
        self.journal.lock().clone()
    }
}

#[async_trait]
impl ExecutorProvider for StubProvider {
    fn can_create(&self) -> bool {
        self.can_create.load(Ordering::SeqCst)
    }

    async fn acquire(&self, _runner: &RunnerConfig) -> Result<ExecutorData, BuildError> {
        if self.fail_acquire.load(Ordering::SeqCst) {
            return Err(BuildError::failed("acquire refused"));
        }
        let token = self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(token))
    }

    async fn release(&self, _runner: &RunnerConfig, _data: ExecutorData) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }

    fn create(&self) -> Box<dyn Executor> {
        Box::new(StubExecutor {
            plan: self.plan.lock().clone(),
            journal: self.journal.clone(),
            build_dirs: self.build_dirs.clone(),
        })
    }
}
