// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lw-daemon: the concurrent job supervisor.
//!
//! Turns the configured runner list into a stream of acquired execution
//! slots, matches those slots against an elastic worker pool bounded by the
//! global concurrency cap, drives each job through the executor protocol
//! while streaming its trace, and reacts to config reloads and the three
//! shutdown modes (graceful, forced, timed out).

pub mod adapters;
pub mod builds;
pub mod driver;
pub mod feeder;
pub mod health;
pub mod pool;
pub mod registry;
pub mod supervisor;
pub mod trace;
pub mod watcher;

#[cfg(test)]
pub(crate) mod test_support;

pub use adapters::NoopNetwork;
pub use builds::BuildsRegistry;
pub use driver::JobDriver;
pub use feeder::{RunnerFeeder, Slot};
pub use health::HealthTracker;
pub use registry::ProviderRegistry;
pub use supervisor::{ShutdownError, ShutdownState, StopKind, Supervisor, SupervisorOptions};
pub use trace::TraceUpdater;
pub use watcher::{ConfigWatcher, SharedConfig};
