// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote shell adapter used to bootstrap worker instances.
//!
//! # Module layout
//!
//! - [`openssh`]: drives the system `ssh` client as a subprocess
//! - `fake`: scripted in-memory shell for tests (behind `test-support`)
//!
//! Connection failures are split by what the caller should do next:
//! [`ShellError::Unreachable`] means "not ready yet, try again shortly",
//! [`ShellError::AuthFailed`] means the host answered but refused the key.

pub mod openssh;

use crate::identity::PrivateKey;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};

pub use openssh::OpenSshShell;

/// Errors from remote shell operations
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("host unreachable: {0}")]
    Unreachable(String),
    #[error("authentication failed: {0}")]
    AuthFailed(String),
    #[error("remote command failed: {0}")]
    Exec(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Where to connect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshTarget {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
}

impl SshTarget {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into(), port: 22, connect_timeout: Duration::from_secs(10) }
    }

    tender_core::setters! {
        set {
            port: u16,
            connect_timeout: Duration,
        }
    }
}

/// Result of a remote command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Standard streams of a process started with [`ShellSession::spawn`]
pub struct ProcessStreams {
    pub stdin: Box<dyn AsyncWrite + Send + Unpin>,
    pub stdout: Box<dyn AsyncRead + Send + Unpin>,
    /// Local child backing the streams, killed when the channel closes
    pub child: Option<tokio::process::Child>,
}

/// Opens authenticated sessions to instances
#[async_trait]
pub trait RemoteShell: Send + Sync + 'static {
    async fn connect(
        &self,
        target: &SshTarget,
        key: &PrivateKey,
    ) -> Result<Box<dyn ShellSession>, ShellError>;
}

/// An authenticated session to one instance
#[async_trait]
pub trait ShellSession: Send + Sync {
    async fn exec(&self, command: &str) -> Result<ExecOutput, ShellError>;

    /// Write `contents` to `remote_path` and chmod it to `mode`.
    async fn upload(&self, contents: &[u8], remote_path: &str, mode: u32) -> Result<(), ShellError>;

    /// Start a long-running process and hand back its standard streams.
    async fn spawn(&self, command: &str) -> Result<ProcessStreams, ShellError>;

    async fn close(&self);
}

/// Quote a string for a POSIX shell
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake;

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeConnect, FakeRemoteShell};

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
