// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bring a running instance up to a live worker channel.
//!
//! The launcher first waits until SSH accepts the key, retrying refused
//! authentication while cloud-init installs it. It then opens the session the
//! worker runs on, where a refused key is fatal, runs the template's init
//! script once per instance, installs the worker runtime if missing, uploads
//! the worker artifact and spawns the worker process.

use crate::agent::Agent;
use crate::provision::remote_user;
use crate::EngineError;
use std::sync::Arc;
use std::time::Duration;
use tender_adapters::shell::shell_quote;
use tender_adapters::{
    PrivateKey, ProcessStreams, ShellError, ShellSession, SshTarget, WorkerChannel,
};
use tender_core::{Clock, UNSPECIFIED_ADDRESS};
use tokio::time::Instant;

/// Marker file recording that the init script already ran on an instance
pub const INIT_MARKER: &str = "~/.tender-run-init";

/// Why a connection attempt gave up
enum ConnectFailure {
    /// The host answered but refused the key; worth retrying later
    Rejected(ShellError),
    Abort(EngineError),
}

pub struct BootstrapLauncher<C: Clock> {
    agent: Arc<Agent<C>>,
    key: PrivateKey,
    started: Instant,
}

impl<C: Clock> BootstrapLauncher<C> {
    /// Connect to `agent`'s instance and start the worker on it.
    pub async fn launch(agent: &Arc<Agent<C>>) -> Result<WorkerChannel, EngineError> {
        let cloud = agent.cloud();
        let key = cloud.resolve_key().await?;
        let user = remote_user(&key).to_string();
        let key = if key.username() == user { key } else { PrivateKey::new(key.pem(), user)? };
        let launcher = Self { agent: Arc::clone(agent), key, started: Instant::now() };

        tracing::info!(instance_id = %agent.id(), "launching worker");
        launcher.bootstrap().await?;
        let session = match launcher.connect().await {
            Ok(session) => session,
            Err(ConnectFailure::Abort(e)) => return Err(e),
            Err(ConnectFailure::Rejected(e)) => return Err(EngineError::LoginFailed(e.to_string())),
        };
        match launcher.prepare(session.as_ref()).await {
            Ok(streams) => {
                tracing::info!(
                    instance_id = %agent.id(),
                    elapsed_ms = launcher.started.elapsed().as_millis() as u64,
                    "worker launched"
                );
                Ok(WorkerChannel::new(streams, session))
            }
            Err(e) => {
                session.close().await;
                Err(e)
            }
        }
    }

    /// Wait until the instance accepts the key, sleeping between refused
    /// logins until the auth budget runs out.
    async fn bootstrap(&self) -> Result<(), EngineError> {
        let cloud = self.agent.cloud();
        let retry = cloud.engine().retry_interval;
        let tries = auth_tries(cloud.config().auth_sleep(), retry);

        for attempt in 1..=tries {
            match self.connect().await {
                Ok(session) => {
                    session.close().await;
                    return Ok(());
                }
                Err(ConnectFailure::Abort(e)) => return Err(e),
                Err(ConnectFailure::Rejected(e)) => {
                    tracing::info!(
                        instance_id = %self.agent.id(),
                        attempt,
                        tries,
                        error = %e,
                        "authentication failed, will retry"
                    );
                    if attempt < tries {
                        tokio::time::sleep(retry).await;
                    }
                }
            }
        }
        Err(EngineError::LoginFailed(format!(
            "authentication failed {} times for {}",
            tries,
            self.agent.id()
        )))
    }

    /// Wait for SSH to accept connections on the instance's address.
    async fn connect(&self) -> Result<Box<dyn ShellSession>, ConnectFailure> {
        let cloud = self.agent.cloud();
        let engine = cloud.engine();
        loop {
            if let Some(cause) = self.agent.offline_cause() {
                return Err(ConnectFailure::Abort(EngineError::Client(format!(
                    "launch of {} aborted: {}",
                    self.agent.id(),
                    cause
                ))));
            }
            self.check_deadline().map_err(ConnectFailure::Abort)?;

            match self.host_address().await.map_err(ConnectFailure::Abort)? {
                Some(host) => {
                    let target = SshTarget::new(host)
                        .port(engine.ssh_port)
                        .connect_timeout(engine.connect_timeout);
                    match cloud.shell().connect(&target, &self.key).await {
                        Ok(session) => {
                            tracing::info!(instance_id = %self.agent.id(), host = %target.host, "connected");
                            return Ok(session);
                        }
                        Err(e @ ShellError::AuthFailed(_)) => return Err(ConnectFailure::Rejected(e)),
                        Err(e) => tracing::info!(
                            instance_id = %self.agent.id(),
                            host = %target.host,
                            error = %e,
                            "ssh not available yet"
                        ),
                    }
                }
                None => tracing::info!(instance_id = %self.agent.id(), "waiting for an address"),
            }
            tokio::time::sleep(engine.connect_retry).await;
        }
    }

    /// Current reachable address; `None` until one is assigned.
    async fn host_address(&self) -> Result<Option<String>, EngineError> {
        match self.agent.instance(true).await {
            Ok(Some(instance)) => Ok(instance
                .host_address()
                .filter(|a| *a != UNSPECIFIED_ADDRESS)
                .map(str::to_string)),
            Ok(None) => Err(EngineError::NoAddress(self.agent.id().clone())),
            Err(e) => {
                tracing::debug!(instance_id = %self.agent.id(), error = %e, "failed to fetch instance");
                Ok(None)
            }
        }
    }

    fn check_deadline(&self) -> Result<(), EngineError> {
        let Some(timeout) = self.agent.template().launch_timeout() else {
            return Ok(());
        };
        let waited = self.started.elapsed();
        if waited < timeout {
            return Ok(());
        }
        Err(EngineError::Timeout(format!(
            "timed out after {} seconds of waiting for ssh to become available (maximum timeout configured is {})",
            waited.as_secs(),
            timeout.as_secs()
        )))
    }

    /// Everything between login and a running worker process.
    async fn prepare(
        &self,
        session: &dyn ShellSession,
    ) -> Result<ProcessStreams, EngineError> {
        let template = self.agent.template();
        let worker = &self.agent.cloud().config().worker;
        let tmp = match template.tmp_dir.trim() {
            "" => "/tmp",
            dir => dir,
        };

        run(session, &format!("mkdir -p {}", shell_quote(tmp))).await?;
        if let Some(script) = template.init_script() {
            self.run_init_script(session, tmp, script).await?;
        }
        self.ensure(session, &worker.runtime_check, &worker.runtime_install, "worker runtime").await?;
        self.ensure(session, &worker.copy_check, &worker.copy_install, "file copy tools").await?;

        if let Some(path) = &worker.artifact_path {
            let contents = tokio::fs::read(path).await.map_err(|e| {
                EngineError::Client(format!("failed to read worker artifact {}: {}", path.display(), e))
            })?;
            let remote = format!("{}/{}", tmp, worker.artifact_name);
            tracing::info!(instance_id = %self.agent.id(), path = %remote, bytes = contents.len(), "uploading worker artifact");
            session.upload(&contents, &remote, 0o644).await?;
        }

        let command = worker.launch_command_for(tmp, template.work_dir());
        tracing::info!(instance_id = %self.agent.id(), command = %command, "starting worker");
        Ok(session.spawn(&command).await?)
    }

    /// Run the init script unless the marker says it already ran.
    async fn run_init_script(
        &self,
        session: &dyn ShellSession,
        tmp: &str,
        script: &str,
    ) -> Result<(), EngineError> {
        if session.exec(&format!("test -e {}", INIT_MARKER)).await?.success() {
            tracing::debug!(instance_id = %self.agent.id(), "init script already ran");
            return Ok(());
        }

        tracing::info!(instance_id = %self.agent.id(), "executing init script");
        let path = format!("{}/init.sh", tmp);
        session.upload(script.as_bytes(), &path, 0o700).await?;
        let output = session.exec(&format!("sudo {}", path)).await?;
        if !output.success() {
            return Err(EngineError::LaunchScript(format!(
                "init script exited with status {}: {}",
                output.status,
                output.stderr.trim()
            )));
        }
        run(session, &format!("sudo touch {}", INIT_MARKER)).await
    }

    /// Run `install` when `check` fails, then require `check` to pass.
    async fn ensure(
        &self,
        session: &dyn ShellSession,
        check: &str,
        install: &str,
        what: &str,
    ) -> Result<(), EngineError> {
        if check.trim().is_empty() || session.exec(check).await?.success() {
            return Ok(());
        }
        tracing::info!(instance_id = %self.agent.id(), what, "installing");
        let output = session.exec(install).await?;
        if !output.success() {
            return Err(EngineError::LaunchScript(format!(
                "failed to install {} (status {}): {}",
                what,
                output.status,
                output.stderr.trim()
            )));
        }
        if !session.exec(check).await?.success() {
            return Err(EngineError::LaunchScript(format!("{} still missing after install", what)));
        }
        Ok(())
    }
}

/// Number of login attempts that fit in the auth budget, at least one.
pub fn auth_tries(auth_sleep: Duration, retry_interval: Duration) -> u32 {
    let retry_ms = retry_interval.as_millis().max(1);
    ((auth_sleep.as_millis() / retry_ms) as u32).max(1)
}

async fn run(session: &dyn ShellSession, command: &str) -> Result<(), EngineError> {
    let output = session.exec(command).await?;
    if output.success() {
        Ok(())
    } else {
        Err(EngineError::Client(format!(
            "`{}` exited with status {}: {}",
            command,
            output.status,
            output.stderr.trim()
        )))
    }
}

#[cfg(test)]
#[path = "bootstrap_tests.rs"]
mod tests;
