// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tenderd check` specs

use crate::prelude::*;

#[test]
fn offline_check_prints_key_fingerprint() {
    let fixture = Fixture::new();
    let config = fixture.config(LINUX_TEMPLATE);

    cli()
        .args(&["check", "--offline", "--config"])
        .args(&[config.to_str().unwrap()])
        .passes()
        .stdout_has("cloud ycloud: 1 template(s)")
        .stdout_has("fingerprint: ssh-rsa ")
        .stdout_has("token: skipped (offline)");
}

#[test]
fn config_path_can_come_from_env() {
    let fixture = Fixture::new();
    let config = fixture.config(LINUX_TEMPLATE);

    cli().args(&["check", "--offline"]).env("TENDER_CONFIG", &config).passes().stdout_has("ok");
}

#[test]
fn invalid_vm_name_is_rejected() {
    let fixture = Fixture::new();
    let config = fixture.config(
        r#"[[cloud.template]]
name = "bad"
vm_name = "CI_Worker"
"#,
    );

    cli()
        .args(&["check", "--offline", "--config", config.to_str().unwrap()])
        .fails()
        .stderr_has("invalid vm name");
}

#[test]
fn missing_config_file_is_reported() {
    let fixture = Fixture::new();
    let missing = fixture.path("absent.toml");

    cli()
        .args(&["check", "--offline", "--config", missing.to_str().unwrap()])
        .fails()
        .stderr_has("absent.toml");
}

#[test]
fn unreadable_key_fails_the_check() {
    let fixture = Fixture::new();
    let config = fixture.config(LINUX_TEMPLATE);
    std::fs::write(fixture.path("id_rsa"), "not a key").unwrap();

    cli()
        .args(&["check", "--offline", "--config", config.to_str().unwrap()])
        .fails()
        .stderr_has("cloud ycloud");
}

#[test]
fn online_check_needs_credentials() {
    let fixture = Fixture::new();
    let config = fixture.config(LINUX_TEMPLATE);

    cli()
        .args(&["check", "--config", config.to_str().unwrap()])
        .fails()
        .stderr_has("cloud ycloud");
}
