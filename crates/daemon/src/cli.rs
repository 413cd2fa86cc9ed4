// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command-line interface of `tenderd`

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "tenderd", version, about = "Elastic worker fleet for CI schedulers")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the fleet daemon until SIGINT/SIGTERM
    Run {
        /// Config file (default: $TENDER_CONFIG, then the user config dir)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Label of the work to provision for at startup
        #[arg(long, requires = "workload")]
        label: Option<String>,
        /// Executors of excess work to provision for at startup
        #[arg(long)]
        workload: Option<i64>,
    },
    /// Validate config, SSH keys and credentials, then exit
    Check {
        #[arg(long)]
        config: Option<PathBuf>,
        /// Skip the token exchange
        #[arg(long)]
        offline: bool,
    },
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
