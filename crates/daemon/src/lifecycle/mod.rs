// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: startup, the retention tick loop and shutdown.

mod startup;
pub use startup::{production_deps, startup, startup_with};

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tender_core::{Clock, SystemClock};
use tender_engine::{FleetEvent, Orchestrator};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::ConfigError;

/// Buffered fleet events before emitters wait on the log loop
pub const EVENT_BUFFER: usize = 100;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/tender)
    pub state_dir: PathBuf,
    /// Path to the `tender.toml` in use
    pub config_path: PathBuf,
    /// Interval between retention checks
    pub tick: Duration,
}

impl Config {
    /// Resolve paths from the CLI flag and environment.
    pub fn load(config_path: Option<&std::path::Path>) -> Result<Self, LifecycleError> {
        Ok(Self {
            state_dir: crate::env::state_dir()?,
            config_path: crate::config::resolve_path(config_path)?,
            tick: crate::env::tick_interval(),
        })
    }
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not determine state directory")]
    NoStateDir,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("failed to initialize logging: {0}")]
    Logging(String),
}

/// A running daemon with the production clock
pub type SystemDaemon = Daemon<SystemClock>;

/// Orchestrator plus the receiving end of its event stream
pub struct Daemon<C: Clock> {
    orchestrator: Arc<Orchestrator<C>>,
    events: mpsc::Receiver<FleetEvent>,
}

impl<C: Clock> Daemon<C> {
    pub fn orchestrator(&self) -> &Arc<Orchestrator<C>> {
        &self.orchestrator
    }

    /// Ask for capacity once at startup, detaching the readiness waiters.
    pub async fn provision(&self, label: Option<&str>, workload: i64) {
        let planned = self.orchestrator.provision(label, workload).await;
        for agent in &planned {
            info!(cloud = %agent.cloud, template = %agent.template.name, "agent planned");
        }
    }

    /// Run retention ticks and log fleet events until `shutdown` resolves.
    pub async fn run(mut self, tick: Duration, shutdown: impl Future<Output = ()>) {
        let mut interval = tokio::time::interval(tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            clouds = self.orchestrator.clouds().len(),
            tick_ms = tick.as_millis() as u64,
            "tenderd running"
        );
        // Ticks run on their own task so this loop keeps draining events
        let mut in_flight: Option<JoinHandle<()>> = None;
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = interval.tick() => {
                    if in_flight.as_ref().is_some_and(|tick| !tick.is_finished()) {
                        debug!("previous tick still running, skipping");
                    } else {
                        in_flight = Some(tokio::spawn(tick_once(Arc::clone(&self.orchestrator))));
                    }
                }
                Some(event) = self.events.recv() => log_event(&event),
            }
        }

        if let Some(tick) = in_flight {
            tick.abort();
        }
        self.orchestrator.shutdown().await;
        while let Ok(event) = self.events.try_recv() {
            log_event(&event);
        }
        info!("tenderd stopped");
    }
}

async fn tick_once<C: Clock>(orchestrator: Arc<Orchestrator<C>>) {
    let removed = orchestrator.reconcile().await;
    if removed > 0 {
        info!(removed, "dropped agents whose instances vanished");
    }
    for handle in orchestrator.tick() {
        if let Err(e) = handle.await {
            warn!(error = %e, "retention check task failed");
        }
    }
}

fn log_event(event: &FleetEvent) {
    match event {
        FleetEvent::LaunchFailed { .. } | FleetEvent::ProvisionFailed { .. } => {
            warn!(event = %event.log_summary(), "fleet event")
        }
        _ => info!(event = %event.log_summary(), "fleet event"),
    }
}

/// Resolves on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable, waiting for ctrl-c only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    info!("shutdown requested");
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
