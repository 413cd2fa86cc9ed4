// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Helpers for driving `tenderd` from specs

use std::path::PathBuf;

use assert_cmd::Command;
use tempfile::TempDir;

pub const TEST_KEY: &str = include_str!("../../crates/adapters/src/identity/testdata/rsa3072.pem");

/// A `tenderd` invocation isolated from the caller's environment
pub fn cli() -> Cli {
    let mut cmd = Command::cargo_bin("tenderd").unwrap();
    cmd.env_remove("TENDER_CONFIG").env_remove("TENDER_LOG");
    Cli { cmd }
}

pub struct Cli {
    cmd: Command,
}

impl Cli {
    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn env(mut self, key: &str, value: impl AsRef<std::ffi::OsStr>) -> Self {
        self.cmd.env(key, value);
        self
    }

    pub fn passes(mut self) -> Output {
        let output = self.cmd.assert().success().get_output().clone();
        Output::from(output)
    }

    pub fn fails(mut self) -> Output {
        let output = self.cmd.assert().failure().get_output().clone();
        Output::from(output)
    }
}

pub struct Output {
    stdout: String,
    stderr: String,
}

impl From<std::process::Output> for Output {
    fn from(output: std::process::Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

impl Output {
    pub fn stdout_has(self, needle: &str) -> Self {
        assert!(self.stdout.contains(needle), "stdout missing {needle:?}:\n{}", self.stdout);
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        assert!(self.stderr.contains(needle), "stderr missing {needle:?}:\n{}", self.stderr);
        self
    }
}

/// Scratch dir holding a config file and an SSH key
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("id_rsa"), TEST_KEY).unwrap();
        Self { dir }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write `tender.toml` with one cloud whose templates are `templates`.
    pub fn config(&self, templates: &str) -> PathBuf {
        let body = format!(
            r#"[[cloud]]
name = "ycloud"
credentials_file = "{sa}"

[cloud.ssh]
private_key_file = "{key}"
username = "builder"

{templates}"#,
            sa = self.path("sa.json").display(),
            key = self.path("id_rsa").display(),
        );
        let path = self.path("tender.toml");
        std::fs::write(&path, body).unwrap();
        path
    }
}

pub const LINUX_TEMPLATE: &str = r#"[[cloud.template]]
name = "linux-small"
vm_name = "ci-small"
labels = ["linux"]
"#;
