// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted remote shell that simulates one host filesystem per address

use super::{ExecOutput, ProcessStreams, RemoteShell, ShellError, ShellSession, SshTarget};
use crate::identity::PrivateKey;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::io::DuplexStream;

/// Scripted outcome for one connection attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeConnect {
    Ok,
    Unreachable,
    AuthFailed,
}

#[derive(Default)]
struct FakeHost {
    files: HashMap<String, (Vec<u8>, u32)>,
    markers: HashSet<String>,
    commands: Vec<String>,
    spawned: Vec<String>,
    remote_ends: Vec<DuplexStream>,
}

#[derive(Default)]
struct FakeShellState {
    connect_script: VecDeque<FakeConnect>,
    connects: Vec<String>,
    failing: HashMap<String, i32>,
    spawn_error: Option<String>,
    hosts: HashMap<String, FakeHost>,
    closed: usize,
}

/// Fake remote shell for testing
#[derive(Clone, Default)]
pub struct FakeRemoteShell {
    inner: Arc<Mutex<FakeShellState>>,
}

impl FakeRemoteShell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue outcomes for the next connection attempts; once drained, connects succeed.
    pub fn script_connects(&self, outcomes: impl IntoIterator<Item = FakeConnect>) {
        self.inner.lock().connect_script.extend(outcomes);
    }

    /// Make every command starting with `prefix` exit with `status`.
    pub fn fail_command(&self, prefix: impl Into<String>, status: i32) {
        self.inner.lock().failing.insert(prefix.into(), status);
    }

    pub fn set_spawn_error(&self, message: impl Into<String>) {
        self.inner.lock().spawn_error = Some(message.into());
    }

    pub fn connect_attempts(&self) -> usize {
        self.inner.lock().connects.len()
    }

    pub fn commands(&self, host: &str) -> Vec<String> {
        self.inner.lock().hosts.get(host).map(|h| h.commands.clone()).unwrap_or_default()
    }

    pub fn spawned(&self, host: &str) -> Vec<String> {
        self.inner.lock().hosts.get(host).map(|h| h.spawned.clone()).unwrap_or_default()
    }

    pub fn file(&self, host: &str, path: &str) -> Option<(Vec<u8>, u32)> {
        self.inner.lock().hosts.get(host).and_then(|h| h.files.get(path).cloned())
    }

    pub fn has_marker(&self, host: &str, path: &str) -> bool {
        self.inner.lock().hosts.get(host).is_some_and(|h| h.markers.contains(path))
    }

    /// Number of times an uploaded init script was executed on `host`.
    pub fn init_runs(&self, host: &str) -> usize {
        self.commands(host)
            .iter()
            .filter(|c| c.starts_with("sudo ") && c.ends_with("/init.sh"))
            .count()
    }

    pub fn closed_sessions(&self) -> usize {
        self.inner.lock().closed
    }
}

#[async_trait]
impl RemoteShell for FakeRemoteShell {
    async fn connect(
        &self,
        target: &SshTarget,
        _key: &PrivateKey,
    ) -> Result<Box<dyn ShellSession>, ShellError> {
        let mut state = self.inner.lock();
        state.connects.push(target.host.clone());
        match state.connect_script.pop_front().unwrap_or(FakeConnect::Ok) {
            FakeConnect::Ok => {}
            FakeConnect::Unreachable => {
                return Err(ShellError::Unreachable(format!(
                    "ssh: connect to host {} port {}: Connection refused",
                    target.host, target.port
                )))
            }
            FakeConnect::AuthFailed => {
                return Err(ShellError::AuthFailed("Permission denied (publickey).".to_string()))
            }
        }
        state.hosts.entry(target.host.clone()).or_default();
        Ok(Box::new(FakeSession { host: target.host.clone(), inner: Arc::clone(&self.inner) }))
    }
}

struct FakeSession {
    host: String,
    inner: Arc<Mutex<FakeShellState>>,
}

#[async_trait]
impl ShellSession for FakeSession {
    async fn exec(&self, command: &str) -> Result<ExecOutput, ShellError> {
        let mut state = self.inner.lock();
        let failing = state
            .failing
            .iter()
            .find(|(prefix, _)| command.starts_with(prefix.as_str()))
            .map(|(_, status)| *status);
        let host = state.hosts.entry(self.host.clone()).or_default();
        host.commands.push(command.to_string());
        if let Some(status) = failing {
            return Ok(ExecOutput { status, stderr: format!("{}: failed", command), ..Default::default() });
        }

        let status = if let Some(path) = command.strip_prefix("test -e ") {
            i32::from(!host.markers.contains(path) && !host.files.contains_key(path))
        } else if let Some(path) = command.strip_prefix("sudo touch ") {
            host.markers.insert(path.to_string());
            0
        } else {
            0
        };
        Ok(ExecOutput { status, ..Default::default() })
    }

    async fn upload(&self, contents: &[u8], remote_path: &str, mode: u32) -> Result<(), ShellError> {
        let mut state = self.inner.lock();
        let host = state.hosts.entry(self.host.clone()).or_default();
        host.files.insert(remote_path.to_string(), (contents.to_vec(), mode));
        Ok(())
    }

    async fn spawn(&self, command: &str) -> Result<ProcessStreams, ShellError> {
        let mut state = self.inner.lock();
        if let Some(message) = state.spawn_error.clone() {
            return Err(ShellError::Exec(message));
        }
        let (local, remote) = tokio::io::duplex(64 * 1024);
        let (stdout, stdin) = tokio::io::split(local);
        let host = state.hosts.entry(self.host.clone()).or_default();
        host.spawned.push(command.to_string());
        host.remote_ends.push(remote);
        Ok(ProcessStreams { stdin: Box::new(stdin), stdout: Box::new(stdout), child: None })
    }

    async fn close(&self) {
        self.inner.lock().closed += 1;
    }
}
