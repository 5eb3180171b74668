// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `legwork check` - validate the config file and print a runner summary.

use anyhow::Result;
use clap::Args;
use lw_core::{Config, RunnerConfig};
use std::path::PathBuf;

#[derive(Args)]
pub struct CheckArgs {
    /// Path to the config file
    #[arg(short = 'c', long, default_value = "legwork.toml")]
    pub config: PathBuf,
}

pub fn check(args: CheckArgs) -> Result<()> {
    let config = Config::load(&args.config)?;
    println!("config: {}", args.config.display());
    println!("concurrent: {}", config.concurrent);
    if let Some(user) = &config.user {
        println!("user: {user}");
    }
    for runner in &config.runners {
        println!("{}", runner_line(runner));
    }
    Ok(())
}

fn runner_line(runner: &RunnerConfig) -> String {
    let limit = if runner.limit == 0 { "unlimited".to_string() } else { runner.limit.to_string() };
    format!(
        "runner {} [{}]: url={} executor={} limit={}",
        if runner.name.is_empty() { "(unnamed)" } else { runner.name.as_str() },
        runner.unique_id(),
        runner.url,
        runner.executor,
        limit
    )
}

#[cfg(test)]
#[path = "check_tests.rs"]
mod tests;
