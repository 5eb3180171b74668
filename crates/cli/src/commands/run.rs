// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `legwork run` - run the build agent daemon.

use anyhow::{Context, Result};
use clap::Args;
use lw_daemon::{NoopNetwork, ProviderRegistry, StopKind, Supervisor, SupervisorOptions};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Args)]
pub struct RunArgs {
    /// Path to the config file
    #[arg(short = 'c', long, default_value = "legwork.toml")]
    pub config: PathBuf,

    /// Change to this directory before starting
    #[arg(short = 'd', long)]
    pub working_directory: Option<PathBuf>,

    /// User to execute build scripts as
    #[arg(short = 'u', long)]
    pub user: Option<String>,
}

pub async fn run(args: RunArgs) -> Result<()> {
    if let Some(dir) = &args.working_directory {
        std::env::set_current_dir(dir)
            .with_context(|| format!("failed to change to working directory {}", dir.display()))?;
    }

    // Executor backends register their providers here when compiled in;
    // runners whose kind has no provider are skipped by the feeder. The
    // network stand-in reports no work until a job-server client is wired
    // into the build.
    let providers = ProviderRegistry::new();
    let network: Arc<dyn lw_core::Network> = Arc::new(NoopNetwork);

    let mut options = SupervisorOptions::new(&args.config);
    options.user = args.user.clone();
    let supervisor =
        Supervisor::new(network, providers, options).context("failed to start agent")?;

    let (stop_tx, stop_rx) = mpsc::channel(1);
    let (reload_tx, reload_rx) = mpsc::channel(1);
    listen_for_signals(stop_tx, reload_tx)?;

    supervisor.execute(stop_rx, reload_rx).await?;
    Ok(())
}

/// Forward process signals into the supervisor's channels: SIGQUIT asks for
/// a graceful stop, SIGTERM/SIGINT force, SIGHUP reloads the config.
#[cfg(unix)]
fn listen_for_signals(stop_tx: mpsc::Sender<StopKind>, reload_tx: mpsc::Sender<()>) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;
    let mut interrupt = signal(SignalKind::interrupt()).context("installing SIGINT handler")?;
    let mut quit = signal(SignalKind::quit()).context("installing SIGQUIT handler")?;
    let mut hangup = signal(SignalKind::hangup()).context("installing SIGHUP handler")?;

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = terminate.recv() => {
                    let _ = stop_tx.send(StopKind::Forced("SIGTERM")).await;
                }
                _ = interrupt.recv() => {
                    let _ = stop_tx.send(StopKind::Forced("SIGINT")).await;
                }
                _ = quit.recv() => {
                    let _ = stop_tx.send(StopKind::Graceful).await;
                }
                _ = hangup.recv() => {
                    let _ = reload_tx.send(()).await;
                }
            }
        }
    });
    Ok(())
}

#[cfg(not(unix))]
fn listen_for_signals(stop_tx: mpsc::Sender<StopKind>, _reload_tx: mpsc::Sender<()>) -> Result<()> {
    tokio::spawn(async move {
        loop {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            let _ = stop_tx.send(StopKind::Forced("interrupt")).await;
        }
    });
    Ok(())
}
