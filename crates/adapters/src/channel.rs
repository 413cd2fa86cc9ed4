// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Byte channel to a launched worker process.

use crate::shell::{ProcessStreams, ShellSession};
use tokio::io::{AsyncRead, AsyncWrite};

/// Standard streams of the remote worker, plus the session that carries them.
///
/// Closing the channel stops the worker process and then the session.
pub struct WorkerChannel {
    stdin: Box<dyn AsyncWrite + Send + Unpin>,
    stdout: Box<dyn AsyncRead + Send + Unpin>,
    child: Option<tokio::process::Child>,
    session: Box<dyn ShellSession>,
}

impl WorkerChannel {
    pub fn new(streams: ProcessStreams, session: Box<dyn ShellSession>) -> Self {
        Self { stdin: streams.stdin, stdout: streams.stdout, child: streams.child, session }
    }

    /// Writer feeding the worker's stdin
    pub fn writer(&mut self) -> &mut (dyn AsyncWrite + Send + Unpin) {
        &mut *self.stdin
    }

    /// Reader over the worker's stdout
    pub fn reader(&mut self) -> &mut (dyn AsyncRead + Send + Unpin) {
        &mut *self.stdout
    }

    pub async fn close(mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill().await {
                tracing::debug!(error = %e, "worker process already exited");
            }
        }
        self.session.close().await;
    }
}

impl std::fmt::Debug for WorkerChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerChannel").field("local_process", &self.child.is_some()).finish()
    }
}

#[cfg(test)]
#[path = "channel_tests.rs"]
mod tests;
