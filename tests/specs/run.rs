// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tenderd run` specs that stop before any cloud traffic

use crate::prelude::*;

#[test]
fn run_refuses_a_config_without_clouds() {
    let fixture = Fixture::new();
    let config = fixture.path("tender.toml");
    std::fs::write(&config, "").unwrap();

    cli()
        .args(&["run", "--config", config.to_str().unwrap()])
        .env("TENDER_STATE_DIR", fixture.path("state"))
        .fails()
        .stderr_has("config defines no clouds");
}

#[test]
fn run_rejects_label_without_workload() {
    cli().args(&["run", "--label", "linux"]).fails().stderr_has("--workload");
}
