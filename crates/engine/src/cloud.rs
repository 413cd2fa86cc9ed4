// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-cloud runtime: configuration plus the adapters that reach it.
//!
//! Everything an [`Agent`] needs about its cloud is reached through the
//! `Arc<CloudRuntime>` it was constructed with; nothing is looked up by name.

use crate::agent::Agent;
use crate::{EngineConfig, EngineError, FleetEvent, FleetRegistry};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tender_adapters::{ComputeService, KeyProvider, PrivateKey, RemoteShell};
use tender_core::{Clock, CloudConfig, Instance, InstanceId, TemplateConfig};
use tokio::sync::{mpsc, Semaphore};

/// Adapter dependencies of a cloud
#[derive(Clone)]
pub struct RuntimeDeps {
    pub compute: Arc<dyn ComputeService>,
    pub shell: Arc<dyn RemoteShell>,
    pub keys: Arc<dyn KeyProvider>,
}

pub struct CloudRuntime<C: Clock> {
    config: CloudConfig,
    templates: Vec<Arc<TemplateConfig>>,
    deps: RuntimeDeps,
    fleet: Arc<dyn FleetRegistry<C>>,
    engine: EngineConfig,
    clock: C,
    events: mpsc::Sender<FleetEvent>,
    /// Serializes provisioning calls against this cloud
    provision_lock: tokio::sync::Mutex<()>,
    /// Instances handed out by provisioning but not yet attached to the fleet
    pending: Mutex<HashSet<InstanceId>>,
    launches: Arc<Semaphore>,
    shutting_down: AtomicBool,
}

impl<C: Clock> CloudRuntime<C> {
    pub fn new(
        config: CloudConfig,
        deps: RuntimeDeps,
        fleet: Arc<dyn FleetRegistry<C>>,
        engine: EngineConfig,
        clock: C,
        events: mpsc::Sender<FleetEvent>,
    ) -> Arc<Self> {
        let templates = config.templates.iter().cloned().map(Arc::new).collect();
        let launches = Arc::new(Semaphore::new(engine.max_concurrent_launches.max(1)));
        Arc::new(Self {
            config,
            templates,
            deps,
            fleet,
            engine,
            clock,
            events,
            provision_lock: tokio::sync::Mutex::new(()),
            pending: Mutex::new(HashSet::new()),
            launches,
            shutting_down: AtomicBool::new(false),
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &CloudConfig {
        &self.config
    }

    pub fn templates(&self) -> &[Arc<TemplateConfig>] {
        &self.templates
    }

    pub fn template(&self, name: &str) -> Option<Arc<TemplateConfig>> {
        self.templates.iter().find(|t| t.name == name).cloned()
    }

    /// Templates that may serve work carrying `label`, in configuration order.
    pub fn matching_templates(&self, label: Option<&str>) -> Vec<Arc<TemplateConfig>> {
        self.templates.iter().filter(|t| t.matches_label(label)).cloned().collect()
    }

    pub fn compute(&self) -> &Arc<dyn ComputeService> {
        &self.deps.compute
    }

    pub fn shell(&self) -> &Arc<dyn RemoteShell> {
        &self.deps.shell
    }

    pub fn fleet(&self) -> &Arc<dyn FleetRegistry<C>> {
        &self.fleet
    }

    pub fn engine(&self) -> &EngineConfig {
        &self.engine
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.epoch_ms()
    }

    /// Resolve the SSH identity used for instance metadata and bootstrap.
    pub async fn resolve_key(&self) -> Result<PrivateKey, EngineError> {
        self.deps
            .keys
            .resolve()
            .await
            .ok_or_else(|| EngineError::LoginFailed("failed to get SSH key".to_string()))
    }

    /// Construct an agent bound to this cloud.
    pub fn bind_agent(
        self: &Arc<Self>,
        template: Arc<TemplateConfig>,
        instance: Instance,
    ) -> Arc<Agent<C>> {
        Arc::new(Agent::new(template, Arc::clone(self), instance))
    }

    pub(crate) async fn emit(&self, event: FleetEvent) {
        tracing::debug!(event = %event.log_summary(), "fleet event");
        if self.events.send(event).await.is_err() {
            tracing::debug!(cloud = %self.config.name, "fleet event receiver dropped");
        }
    }

    pub(crate) fn provision_lock(&self) -> &tokio::sync::Mutex<()> {
        &self.provision_lock
    }

    pub(crate) fn mark_pending(&self, id: &InstanceId) {
        self.pending.lock().insert(id.clone());
    }

    pub(crate) fn clear_pending(&self, id: &InstanceId) {
        self.pending.lock().remove(id);
    }

    pub(crate) fn is_pending(&self, id: &InstanceId) -> bool {
        self.pending.lock().contains(id)
    }

    pub(crate) fn launches(&self) -> &Arc<Semaphore> {
        &self.launches
    }

    /// Launch slots currently free
    pub fn available_launch_permits(&self) -> usize {
        self.launches.available_permits()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    pub fn begin_shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
    }
}
