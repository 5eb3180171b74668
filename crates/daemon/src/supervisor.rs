// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor wiring and the shutdown state machine.
//!
//! The supervisor spawns the feeder, the worker-pool manager and the
//! reconciliation loop, then parks on the stop channel. The first signal
//! received is the canonical shutdown witness: a graceful stop lets
//! running builds finish, anything else (or an escalation) broadcasts the
//! abort token and races `run_finished` against the shutdown timeout.

use crate::builds::BuildsRegistry;
use crate::driver::JobDriver;
use crate::feeder::RunnerFeeder;
use crate::health::HealthTracker;
use crate::pool::{SharedSlotReceiver, SharedStopReceiver, WorkerPool};
use crate::registry::ProviderRegistry;
use crate::watcher::{ConfigWatcher, SharedConfig};
use lw_core::{
    Clock, Config, ConfigError, Network, SystemClock, CHECK_INTERVAL, RELOAD_CONFIG_INTERVAL,
    SHUTDOWN_TIMEOUT,
};
use parking_lot::Mutex;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// The kind of stop the process was asked to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopKind {
    /// Stop taking new jobs; let running builds finish (SIGQUIT).
    Graceful,
    /// Abort running builds and exit within the shutdown timeout. Carries
    /// the signal name for the exit error.
    Forced(&'static str),
}

impl fmt::Display for StopKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopKind::Graceful => f.write_str("SIGQUIT"),
            StopKind::Forced(name) => f.write_str(name),
        }
    }
}

/// How the shutdown state machine failed to exit cleanly.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShutdownError {
    /// A further signal arrived while already force-stopping.
    #[error("forced exit: {0}")]
    ForcedExit(StopKind),

    /// Builds did not finish within the shutdown timeout.
    #[error("shutdown timed out")]
    TimedOut,
}

struct ShutdownInner {
    /// The first terminating signal received; the canonical "we are
    /// shutting down" witness every loop tests at its head.
    stop: Mutex<Option<StopKind>>,
    /// Cancelled when shutdown starts so every blocking select unwinds.
    run_token: CancellationToken,
    /// Cancelled in the forced phase; every executor wait observes it.
    abort_token: CancellationToken,
}

/// Shared shutdown state handed to every component.
#[derive(Clone)]
pub struct ShutdownState {
    inner: Arc<ShutdownInner>,
}

impl ShutdownState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ShutdownInner {
                stop: Mutex::new(None),
                run_token: CancellationToken::new(),
                abort_token: CancellationToken::new(),
            }),
        }
    }

    pub fn is_stopping(&self) -> bool {
        self.inner.stop.lock().is_some()
    }

    pub fn stop_kind(&self) -> Option<StopKind> {
        *self.inner.stop.lock()
    }

    /// Record a stop request (the first one wins) and unblock every select.
    pub fn request_stop(&self, kind: StopKind) {
        {
            let mut stop = self.inner.stop.lock();
            if stop.is_none() {
                *stop = Some(kind);
            }
        }
        self.inner.run_token.cancel();
    }

    pub fn run_token(&self) -> &CancellationToken {
        &self.inner.run_token
    }

    pub fn abort_token(&self) -> &CancellationToken {
        &self.inner.abort_token
    }

    /// Broadcast the abort to all in-flight builds.
    pub fn abort_builds(&self) {
        self.inner.abort_token.cancel();
    }
}

impl Default for ShutdownState {
    fn default() -> Self {
        Self::new()
    }
}

/// Construction-time knobs; the intervals default to the process constants
/// and are only narrowed by tests.
pub struct SupervisorOptions {
    pub config_path: PathBuf,
    pub user: Option<String>,
    pub check_interval: Duration,
    pub reload_config_interval: Duration,
    pub shutdown_timeout: Duration,
}

impl SupervisorOptions {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            user: None,
            check_interval: CHECK_INTERVAL,
            reload_config_interval: RELOAD_CONFIG_INTERVAL,
            shutdown_timeout: SHUTDOWN_TIMEOUT,
        }
    }
}

/// The daemon: owns every sub-component and the shutdown state machine.
pub struct Supervisor<C: Clock = SystemClock> {
    network: Arc<dyn Network>,
    providers: Arc<ProviderRegistry>,
    config: SharedConfig,
    watcher: Arc<ConfigWatcher<C>>,
    health: Arc<HealthTracker<C>>,
    builds: Arc<BuildsRegistry>,
    shutdown: ShutdownState,
    worker_count: Arc<AtomicUsize>,
    options: SupervisorOptions,
    clock: C,
}

impl Supervisor<SystemClock> {
    /// Load the initial config and assemble the supervisor.
    ///
    /// A failure here is fatal startup: the caller exits non-zero before
    /// the main loop ever runs.
    pub fn new(
        network: Arc<dyn Network>,
        providers: ProviderRegistry,
        options: SupervisorOptions,
    ) -> Result<Self, ConfigError> {
        Self::with_clock(network, providers, options, SystemClock)
    }
}

impl<C: Clock> Supervisor<C> {
    pub fn with_clock(
        network: Arc<dyn Network>,
        providers: ProviderRegistry,
        options: SupervisorOptions,
        clock: C,
    ) -> Result<Self, ConfigError> {
        let mut initial = Config::load(&options.config_path)?;
        if let Some(user) = &options.user {
            initial.user = Some(user.clone());
        }
        tracing::info!(
            config = %options.config_path.display(),
            concurrent = initial.concurrent,
            runners = initial.runners.len(),
            executors = ?providers.kinds(),
            "starting agent"
        );

        let config = SharedConfig::new(initial);
        let health = Arc::new(HealthTracker::new(clock.clone()));
        let watcher = Arc::new(ConfigWatcher::new(
            options.config_path.clone(),
            config.clone(),
            health.clone(),
            options.user.clone(),
        ));

        Ok(Self {
            network,
            providers: Arc::new(providers),
            config,
            watcher,
            health,
            builds: Arc::new(BuildsRegistry::new()),
            shutdown: ShutdownState::new(),
            worker_count: Arc::new(AtomicUsize::new(0)),
            options,
            clock,
        })
    }

    pub fn shutdown_handle(&self) -> ShutdownState {
        self.shutdown.clone()
    }

    pub fn builds(&self) -> Arc<BuildsRegistry> {
        self.builds.clone()
    }

    pub fn health(&self) -> Arc<HealthTracker<C>> {
        self.health.clone()
    }

    pub fn config(&self) -> SharedConfig {
        self.config.clone()
    }

    /// Live-worker counter, valid for the lifetime of the process.
    pub fn worker_count_handle(&self) -> Arc<AtomicUsize> {
        self.worker_count.clone()
    }

    /// Run the daemon until a stop signal completes the shutdown machine.
    ///
    /// `stop_rx` carries the process-termination signals, `reload_rx` the
    /// explicit reload signal. Returns `Ok(())` on a clean exit (including
    /// a forced stop whose builds finished in time).
    pub async fn execute(
        self,
        stop_rx: mpsc::Receiver<StopKind>,
        reload_rx: mpsc::Receiver<()>,
    ) -> Result<(), ShutdownError> {
        let driver = Arc::new(JobDriver::new(
            self.network.clone(),
            self.config.clone(),
            self.builds.clone(),
            self.health.clone(),
            self.shutdown.abort_token().clone(),
            self.clock.clone(),
        ));

        let (slot_tx, slot_rx) = mpsc::channel(1);
        let slots: SharedSlotReceiver = Arc::new(tokio::sync::Mutex::new(slot_rx));

        let feeder = RunnerFeeder::new(
            self.config.clone(),
            self.health.clone(),
            self.providers.clone(),
            self.shutdown.clone(),
        )
        .with_check_interval(self.options.check_interval);
        let feeder = tokio::spawn(feeder.run(slot_tx));

        let pool = WorkerPool::new(
            driver,
            slots.clone(),
            self.shutdown.clone(),
            self.worker_count.clone(),
        );
        let (start_tx, start_rx) = mpsc::channel(1);
        let (stop_worker_tx, stop_worker_rx) = mpsc::channel(1);
        let stop_workers: SharedStopReceiver = Arc::new(tokio::sync::Mutex::new(stop_worker_rx));
        let manager = tokio::spawn(pool.manage(start_rx, stop_workers));

        let (finished_tx, finished_rx) = mpsc::channel(1);
        tokio::spawn(run_loop(RunLoopCtx {
            shutdown: self.shutdown.clone(),
            config: self.config.clone(),
            watcher: self.watcher.clone(),
            reload_rx,
            start_tx,
            stop_worker_tx,
            slots,
            feeder,
            manager,
            reload_interval: self.options.reload_config_interval,
            finished_tx,
        }));

        self.wait_for_shutdown(stop_rx, finished_rx).await
    }

    /// The shutdown state machine: graceful phase, then forced phase.
    async fn wait_for_shutdown(
        &self,
        mut stop_rx: mpsc::Receiver<StopKind>,
        mut finished_rx: mpsc::Receiver<()>,
    ) -> Result<(), ShutdownError> {
        let first = next_signal(&mut stop_rx).await;
        self.shutdown.request_stop(first);
        let mut current = first;

        while current == StopKind::Graceful {
            tracing::warn!(
                builds = self.builds.builds_count(),
                "requested quit, waiting for builds to finish"
            );
            tokio::select! {
                signal = next_signal(&mut stop_rx) => current = signal,
                _ = finished_rx.recv() => return Ok(()),
            }
        }

        tracing::warn!(
            signal = %current,
            builds = self.builds.builds_count(),
            "requested service stop, aborting builds"
        );
        self.shutdown.abort_builds();
        tokio::select! {
            signal = next_signal(&mut stop_rx) => Err(ShutdownError::ForcedExit(signal)),
            _ = tokio::time::sleep(self.options.shutdown_timeout) => Err(ShutdownError::TimedOut),
            _ = finished_rx.recv() => Ok(()),
        }
    }
}

/// Next stop signal; pends forever if the signal source went away.
async fn next_signal(rx: &mut mpsc::Receiver<StopKind>) -> StopKind {
    match rx.recv().await {
        Some(kind) => kind,
        None => std::future::pending().await,
    }
}

struct RunLoopCtx<C: Clock> {
    shutdown: ShutdownState,
    config: SharedConfig,
    watcher: Arc<ConfigWatcher<C>>,
    reload_rx: mpsc::Receiver<()>,
    start_tx: mpsc::Sender<usize>,
    stop_worker_tx: mpsc::Sender<()>,
    slots: SharedSlotReceiver,
    feeder: JoinHandle<()>,
    manager: JoinHandle<()>,
    reload_interval: Duration,
    finished_tx: mpsc::Sender<()>,
}

struct Interrupted;

/// Reconcile workers and watch the config until shutdown, then tear down.
async fn run_loop<C: Clock>(mut ctx: RunLoopCtx<C>) {
    let mut current_workers = 0usize;
    let mut worker_index = 0usize;

    while !ctx.shutdown.is_stopping() {
        let reconciled = update_workers(
            &ctx.shutdown,
            &ctx.config,
            &ctx.start_tx,
            &ctx.stop_worker_tx,
            &mut current_workers,
            &mut worker_index,
        )
        .await;
        if reconciled.is_err() {
            break;
        }
        let watched =
            update_config(&ctx.shutdown, &ctx.watcher, &mut ctx.reload_rx, ctx.reload_interval)
                .await;
        if watched.is_err() {
            break;
        }
    }

    // Teardown. Closing the worker channels lets idle workers fall out of
    // their select; busy workers finish their current build first.
    drop(ctx.start_tx);
    drop(ctx.stop_worker_tx);
    let _ = ctx.feeder.await;
    let _ = ctx.manager.await;

    // Slots still queued once every worker has exited are released here.
    {
        let mut slot_rx = ctx.slots.lock().await;
        while let Ok(slot) = slot_rx.try_recv() {
            slot.release().await;
        }
    }

    tracing::info!("all workers stopped");
    let _ = ctx.finished_tx.send(()).await;
}

/// Grow or shrink the worker pool to the configured concurrency.
async fn update_workers(
    shutdown: &ShutdownState,
    config: &SharedConfig,
    start_tx: &mpsc::Sender<usize>,
    stop_tx: &mpsc::Sender<()>,
    current: &mut usize,
    index: &mut usize,
) -> Result<(), Interrupted> {
    let desired = config.get().concurrent;

    while *current > desired {
        tokio::select! {
            sent = stop_tx.send(()) => {
                if sent.is_err() {
                    return Err(Interrupted);
                }
                *current -= 1;
            }
            _ = shutdown.run_token().cancelled() => return Err(Interrupted),
        }
    }

    while *current < desired {
        tokio::select! {
            sent = start_tx.send(*index) => {
                if sent.is_err() {
                    return Err(Interrupted);
                }
                *current += 1;
                *index += 1;
            }
            _ = shutdown.run_token().cancelled() => return Err(Interrupted),
        }
    }

    Ok(())
}

/// One watcher tick: periodic mtime check or an explicit reload signal.
async fn update_config<C: Clock>(
    shutdown: &ShutdownState,
    watcher: &ConfigWatcher<C>,
    reload_rx: &mut mpsc::Receiver<()>,
    reload_interval: Duration,
) -> Result<(), Interrupted> {
    tokio::select! {
        _ = tokio::time::sleep(reload_interval) => {
            watcher.check();
        }
        message = reload_rx.recv() => match message {
            Some(()) => {
                let _ = watcher.reload();
            }
            // reload source gone: nothing to watch for but shutdown
            None => {
                shutdown.run_token().cancelled().await;
                return Err(Interrupted);
            }
        },
        _ = shutdown.run_token().cancelled() => return Err(Interrupted),
    }
    Ok(())
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
