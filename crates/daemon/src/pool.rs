// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Elastic worker pool: one task per worker, all consuming a shared slot
//! channel.
//!
//! The supervisor reconciles the live worker count against the configured
//! concurrency by sending ids on the start channel and units on the stop
//! channel; the manager task here spawns workers and joins them all at
//! teardown.

use crate::driver::JobDriver;
use crate::feeder::Slot;
use crate::supervisor::ShutdownState;
use lw_core::Clock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Slot receiver shared by all workers.
///
/// Workers hold the lock only while waiting in their select, never while a
/// job is running.
pub type SharedSlotReceiver = Arc<Mutex<mpsc::Receiver<Slot>>>;

/// Stop-message receiver shared by all workers.
pub type SharedStopReceiver = Arc<Mutex<mpsc::Receiver<()>>>;

enum Wake {
    Slot(Slot),
    Stop,
    Shutdown,
}

#[derive(Clone)]
pub struct WorkerPool<C: Clock> {
    driver: Arc<JobDriver<C>>,
    slots: SharedSlotReceiver,
    shutdown: ShutdownState,
    worker_count: Arc<AtomicUsize>,
}

impl<C: Clock> WorkerPool<C> {
    pub fn new(
        driver: Arc<JobDriver<C>>,
        slots: SharedSlotReceiver,
        shutdown: ShutdownState,
        worker_count: Arc<AtomicUsize>,
    ) -> Self {
        Self { driver, slots, shutdown, worker_count }
    }

    /// Live workers right now.
    pub fn worker_count(&self) -> usize {
        self.worker_count.load(Ordering::SeqCst)
    }

    /// Manager task: spawn a worker per id received on `start_rx`.
    ///
    /// Returns once the start channel closes and every spawned worker has
    /// exited, which is the supervisor's guarantee that no build is still
    /// running.
    pub async fn manage(self, mut start_rx: mpsc::Receiver<usize>, stop: SharedStopReceiver) {
        let mut workers = Vec::new();
        while let Some(id) = start_rx.recv().await {
            tracing::debug!(worker = id, "starting worker");
            workers.push(tokio::spawn(self.clone().worker_loop(id, stop.clone())));
        }
        for worker in workers {
            let _ = worker.await;
        }
    }

    async fn worker_loop(self, id: usize, stop: SharedStopReceiver) {
        self.worker_count.fetch_add(1, Ordering::SeqCst);
        while !self.shutdown.is_stopping() {
            let wake = {
                let mut slots = self.slots.lock().await;
                let mut stop_rx = stop.lock().await;
                tokio::select! {
                    slot = slots.recv() => match slot {
                        Some(slot) => Wake::Slot(slot),
                        None => Wake::Shutdown,
                    },
                    message = stop_rx.recv() => match message {
                        Some(()) => Wake::Stop,
                        None => Wake::Shutdown,
                    },
                    _ = self.shutdown.run_token().cancelled() => Wake::Shutdown,
                }
            };
            match wake {
                Wake::Slot(slot) => self.driver.process(slot).await,
                Wake::Stop => {
                    tracing::debug!(worker = id, "stopping worker");
                    break;
                }
                Wake::Shutdown => break,
            }
        }
        self.worker_count.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
