// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! tenderd: keeps a fleet of cloud instances serving as CI workers

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tender_daemon::cli::{Cli, Command};
use tender_daemon::lifecycle::{self, shutdown_signal, Config};
use tender_daemon::{check, config, env, logging};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        Command::Run { config, label, workload } => {
            run(config.as_deref(), label.as_deref(), workload).await
        }
        Command::Check { config, offline } => run_check(config.as_deref(), offline).await,
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("tenderd: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(
    config_path: Option<&Path>,
    label: Option<&str>,
    workload: Option<i64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let daemon_config = Config::load(config_path)?;
    let _log_guard = logging::init(&daemon_config.state_dir, &env::log_filter())?;
    let tender = config::load(&daemon_config.config_path)?;
    tracing::info!(
        config = %daemon_config.config_path.display(),
        state_dir = %daemon_config.state_dir.display(),
        "starting tenderd"
    );

    let daemon = lifecycle::startup(&tender, env::engine_config());
    if let Some(workload) = workload {
        daemon.provision(label, workload).await;
    }
    daemon.run(daemon_config.tick, shutdown_signal()).await;
    Ok(())
}

async fn run_check(
    config_path: Option<&Path>,
    offline: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = config::resolve_path(config_path)?;
    let tender = config::load(&path)?;
    let mut stdout = std::io::stdout().lock();
    check(&tender, offline, &mut stdout).await?;
    Ok(())
}
