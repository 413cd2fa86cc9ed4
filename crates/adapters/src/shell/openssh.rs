// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`RemoteShell`] backed by the system OpenSSH client.
//!
//! `connect` writes the private key into a private temp directory and opens
//! a control master there, so later commands on the session reuse one
//! authenticated connection. `close` tells the master to exit; dropping the
//! session removes the key file.

use super::{shell_quote, ExecOutput, ProcessStreams, RemoteShell, ShellError, ShellSession, SshTarget};
use crate::identity::PrivateKey;
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Exit status `ssh` reserves for its own failures
const SSH_FAILURE: i32 = 255;

#[derive(Debug, Clone)]
pub struct OpenSshShell {
    program: PathBuf,
}

impl Default for OpenSshShell {
    fn default() -> Self {
        Self { program: PathBuf::from("ssh") }
    }
}

impl OpenSshShell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific `ssh` binary instead of the one on `PATH`.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }
}

#[async_trait]
impl RemoteShell for OpenSshShell {
    async fn connect(
        &self,
        target: &SshTarget,
        key: &PrivateKey,
    ) -> Result<Box<dyn ShellSession>, ShellError> {
        let dir = tempfile::Builder::new().prefix("tender-ssh-").tempdir()?;
        let key_path = dir.path().join("id");
        write_private_key(&key_path, key.pem())?;

        let session = OpenSshSession {
            program: self.program.clone(),
            destination: format!("{}@{}", key.username(), target.host),
            options: ssh_options(target, &key_path, &dir.path().join("ctl")),
            _dir: dir,
        };
        // Establishes the control master and proves the key is accepted
        let probe = session.run("true").await?;
        if !probe.success() {
            return Err(classify_failure(&probe.stderr));
        }
        tracing::debug!(host = %target.host, port = target.port, "ssh session established");
        Ok(Box::new(session))
    }
}

struct OpenSshSession {
    program: PathBuf,
    destination: String,
    options: Vec<String>,
    _dir: TempDir,
}

impl OpenSshSession {
    fn command(&self, remote: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.options).arg(&self.destination).arg("--").arg(remote);
        cmd.stdin(Stdio::null()).kill_on_drop(true);
        cmd
    }

    async fn run(&self, remote: &str) -> Result<ExecOutput, ShellError> {
        let output = self.command(remote).output().await?;
        Ok(ExecOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[async_trait]
impl ShellSession for OpenSshSession {
    async fn exec(&self, command: &str) -> Result<ExecOutput, ShellError> {
        let output = self.run(command).await?;
        if output.status == SSH_FAILURE {
            return Err(classify_failure(&output.stderr));
        }
        Ok(output)
    }

    async fn upload(&self, contents: &[u8], remote_path: &str, mode: u32) -> Result<(), ShellError> {
        let path = shell_quote(remote_path);
        let remote = format!("cat > {path} && chmod {mode:o} {path}");
        let mut child = self
            .command(&remote)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(contents).await?;
            stdin.shutdown().await?;
        }
        let output = child.wait_with_output().await?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        match output.status.code() {
            Some(SSH_FAILURE) => Err(classify_failure(&stderr)),
            _ => Err(ShellError::Exec(format!(
                "failed to upload {}: {}",
                remote_path,
                stderr.trim()
            ))),
        }
    }

    async fn spawn(&self, command: &str) -> Result<ProcessStreams, ShellError> {
        let mut child = self
            .command(command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;
        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(ShellError::Exec("ssh process has no standard streams".to_string()));
        };
        Ok(ProcessStreams { stdin: Box::new(stdin), stdout: Box::new(stdout), child: Some(child) })
    }

    async fn close(&self) {
        let result = Command::new(&self.program)
            .args(&self.options)
            .args(["-O", "exit"])
            .arg(&self.destination)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        if let Err(e) = result {
            tracing::debug!(destination = %self.destination, error = %e, "failed to stop ssh control master");
        }
    }
}

fn write_private_key(path: &Path, pem: &str) -> std::io::Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(pem.as_bytes())?;
    if !pem.ends_with('\n') {
        file.write_all(b"\n")?;
    }
    Ok(())
}

pub(crate) fn ssh_options(target: &SshTarget, key_path: &Path, control_path: &Path) -> Vec<String> {
    let timeout = target.connect_timeout.as_secs().max(1);
    vec![
        "-i".to_string(),
        key_path.display().to_string(),
        "-p".to_string(),
        target.port.to_string(),
        "-o".to_string(),
        "BatchMode=yes".to_string(),
        "-o".to_string(),
        "IdentitiesOnly=yes".to_string(),
        "-o".to_string(),
        "StrictHostKeyChecking=no".to_string(),
        "-o".to_string(),
        "UserKnownHostsFile=/dev/null".to_string(),
        "-o".to_string(),
        "LogLevel=ERROR".to_string(),
        "-o".to_string(),
        format!("ConnectTimeout={}", timeout),
        "-o".to_string(),
        "ControlMaster=auto".to_string(),
        "-o".to_string(),
        format!("ControlPath={}", control_path.display()),
        "-o".to_string(),
        "ControlPersist=60".to_string(),
    ]
}

/// Sort an `ssh` failure into auth rejection versus connectivity.
pub(crate) fn classify_failure(stderr: &str) -> ShellError {
    let message = stderr.trim().to_string();
    let lower = message.to_ascii_lowercase();
    if lower.contains("permission denied")
        || lower.contains("too many authentication failures")
        || lower.contains("no supported authentication methods")
    {
        ShellError::AuthFailed(message)
    } else {
        ShellError::Unreachable(message)
    }
}

#[cfg(test)]
#[path = "openssh_tests.rs"]
mod tests;
