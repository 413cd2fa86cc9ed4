// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wiring clouds from configuration into an orchestrator.

use std::sync::Arc;

use tender_adapters::{FileKeyProvider, OpenSshShell, RestComputeClient};
use tender_core::{Clock, CloudConfig, SystemClock};
use tender_engine::{CloudRuntime, EngineConfig, FleetRegistry, InMemoryFleet, Orchestrator, RuntimeDeps};
use tokio::sync::mpsc;
use tracing::info;

use super::{Daemon, SystemDaemon, EVENT_BUFFER};
use crate::config::TenderConfig;

/// Start the daemon against the real compute API and `ssh`.
pub fn startup(config: &TenderConfig, engine: EngineConfig) -> SystemDaemon {
    let shell = Arc::new(OpenSshShell::new());
    startup_with(config, engine, SystemClock, |cloud| production_deps(cloud, Arc::clone(&shell)))
}

/// Adapters for one cloud: REST compute client, on-disk key, shared shell.
pub fn production_deps(cloud: &CloudConfig, shell: Arc<OpenSshShell>) -> RuntimeDeps {
    RuntimeDeps {
        compute: Arc::new(RestComputeClient::from_config(cloud)),
        shell,
        keys: Arc::new(FileKeyProvider::new(&cloud.ssh.private_key_file, &cloud.ssh.username)),
    }
}

/// Start the daemon with caller-supplied adapters per cloud.
pub fn startup_with<C: Clock>(
    config: &TenderConfig,
    engine: EngineConfig,
    clock: C,
    deps_for: impl Fn(&CloudConfig) -> RuntimeDeps,
) -> Daemon<C> {
    let fleet: Arc<dyn FleetRegistry<C>> = Arc::new(InMemoryFleet::new());
    let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);

    let mut orchestrator = Orchestrator::new(Arc::clone(&fleet));
    for cloud in &config.clouds {
        let runtime = CloudRuntime::new(
            cloud.clone(),
            deps_for(cloud),
            Arc::clone(&fleet),
            engine.clone(),
            clock.clone(),
            event_tx.clone(),
        );
        info!(
            cloud = %cloud.name,
            templates = cloud.templates.len(),
            max_per_request = cloud.max_per_request,
            "cloud registered"
        );
        orchestrator.add_cloud(runtime);
    }

    Daemon { orchestrator: Arc::new(orchestrator), events: event_rx }
}
