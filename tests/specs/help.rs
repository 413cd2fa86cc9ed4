// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Help output specs

use crate::prelude::*;

#[test]
fn help_lists_subcommands() {
    cli().args(&["--help"]).passes().stdout_has("run").stdout_has("check");
}

#[test]
fn run_help_documents_startup_workload() {
    cli().args(&["run", "--help"]).passes().stdout_has("--label").stdout_has("--workload");
}

#[test]
fn version_shows_version() {
    cli().args(&["--version"]).passes().stdout_has(env!("CARGO_PKG_VERSION"));
}

#[test]
fn unknown_subcommand_fails() {
    cli().args(&["provision"]).fails().stderr_has("unrecognized subcommand");
}
