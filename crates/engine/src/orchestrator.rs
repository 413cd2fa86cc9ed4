// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host-facing entry point tying the lifecycle stages together.
//!
//! The host asks for capacity with [`Orchestrator::provision`], reports task
//! accounting, and drives [`Orchestrator::tick`] once a minute. Everything
//! else (readiness, launch, retention, termination) runs on spawned tasks.

use crate::agent::Agent;
use crate::bootstrap::BootstrapLauncher;
use crate::provision::{provision, ProvisionOptions};
use crate::retention::{self, StartDecision};
use crate::{readiness, CloudRuntime, EngineError, FleetEvent, FleetRegistry};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tender_core::{Clock, InstanceId, TemplateConfig};
use tokio::task::JoinHandle;

/// An agent on its way up; the handle resolves once readiness is decided.
pub struct PlannedAgent<C: Clock> {
    pub template: Arc<TemplateConfig>,
    pub cloud: String,
    pub handle: JoinHandle<Option<Arc<Agent<C>>>>,
}

impl<C: Clock> std::fmt::Debug for PlannedAgent<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlannedAgent")
            .field("template", &self.template.name)
            .field("cloud", &self.cloud)
            .finish_non_exhaustive()
    }
}

/// Bootstrap `agent` on a spawned task, bounded by the cloud's launch slots.
///
/// A failed launch leaves the agent registered but offline with the error
/// as its cause and not accepting tasks, and emits
/// [`FleetEvent::LaunchFailed`]. Retention reclaims it later.
pub fn launch_agent<C: Clock>(agent: &Arc<Agent<C>>) -> JoinHandle<Result<(), EngineError>> {
    let agent = Arc::clone(agent);
    agent.set_connecting();
    tokio::spawn(async move {
        let cloud = Arc::clone(agent.cloud());
        let _permit = match Arc::clone(cloud.launches()).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                let e = EngineError::Client("launch slots closed".to_string());
                agent.launch_failed(e.to_string());
                return Err(e);
            }
        };

        match BootstrapLauncher::launch(&agent).await {
            Ok(channel) => {
                agent.attach_channel(channel).await;
                agent.on_connected();
                cloud.emit(FleetEvent::AgentConnected { instance_id: agent.id().clone() }).await;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(instance_id = %agent.id(), error = %e, "launch failed");
                agent.launch_failed(e.to_string());
                cloud
                    .emit(FleetEvent::LaunchFailed {
                        instance_id: agent.id().clone(),
                        error: e.to_string(),
                    })
                    .await;
                Err(e)
            }
        }
    })
}

pub struct Orchestrator<C: Clock> {
    clouds: Vec<Arc<CloudRuntime<C>>>,
    fleet: Arc<dyn FleetRegistry<C>>,
    shutting_down: AtomicBool,
}

impl<C: Clock> Orchestrator<C> {
    pub fn new(fleet: Arc<dyn FleetRegistry<C>>) -> Self {
        Self { clouds: Vec::new(), fleet, shutting_down: AtomicBool::new(false) }
    }

    pub fn add_cloud(&mut self, cloud: Arc<CloudRuntime<C>>) {
        self.clouds.push(cloud);
    }

    pub fn cloud(&self, name: &str) -> Option<&Arc<CloudRuntime<C>>> {
        self.clouds.iter().find(|c| c.name() == name)
    }

    pub fn clouds(&self) -> &[Arc<CloudRuntime<C>>] {
        &self.clouds
    }

    pub fn fleet(&self) -> &Arc<dyn FleetRegistry<C>> {
        &self.fleet
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Request capacity for `excess` executors of work carrying `label`.
    ///
    /// Walks every cloud's matching templates in order until the excess is
    /// covered. Each template contributes at most one agent per call.
    pub async fn provision(&self, label: Option<&str>, excess: i64) -> Vec<PlannedAgent<C>> {
        if self.is_shutting_down() {
            tracing::info!("not provisioning, shutting down");
            return Vec::new();
        }

        let mut planned = Vec::new();
        let mut excess = excess;
        'clouds: for cloud in &self.clouds {
            for template in cloud.matching_templates(label) {
                tracing::info!(
                    cloud = %cloud.name(),
                    template = %template.name,
                    excess,
                    "attempting to provision agent for excess workload"
                );
                let executors = i64::from(template.num_executors.max(1));
                let number = requested_count(excess, executors, cloud.config().max_per_request);

                let result = {
                    let _counting = cloud.provision_lock().lock().await;
                    provision(cloud, &template, number, ProvisionOptions::ALLOW_CREATE).await
                };
                match result {
                    Ok(Some(agent)) => {
                        planned.push(PlannedAgent {
                            template: Arc::clone(&template),
                            cloud: cloud.name().to_string(),
                            handle: tokio::spawn(readiness::await_running(agent)),
                        });
                        excess -= executors;
                        tracing::info!(template = %template.name, excess, "provision attempt finished");
                        if excess <= 0 {
                            break 'clouds;
                        }
                    }
                    Ok(None) => {
                        tracing::warn!(template = %template.name, "no agent could be raised");
                    }
                    Err(e) => {
                        tracing::warn!(template = %template.name, error = %e, "provisioning failed");
                        cloud
                            .emit(FleetEvent::ProvisionFailed {
                                cloud: cloud.name().to_string(),
                                template: template.name.clone(),
                                label: label.map(str::to_string),
                                error: e.to_string(),
                            })
                            .await;
                    }
                }
            }
        }
        tracing::info!(
            agents = self.fleet.agents().len(),
            pending = planned.len(),
            "provisioning round complete"
        );
        planned
    }

    /// Count a task start against `id`; false when the agent is unknown.
    pub fn task_started(&self, id: &InstanceId) -> bool {
        match self.fleet.get(id) {
            Some(agent) => {
                agent.task_started();
                true
            }
            None => false,
        }
    }

    pub fn task_completed(&self, id: &InstanceId) -> bool {
        match self.fleet.get(id) {
            Some(agent) => {
                retention::task_completed(&agent);
                true
            }
            None => false,
        }
    }

    /// Decide whether `id` should be connected and launch it if so.
    pub async fn start(&self, id: &InstanceId, host_starting: bool) -> Option<StartDecision> {
        let agent = self.fleet.get(id)?;
        let decision = retention::start(&agent, host_starting).await;
        if decision == StartDecision::Connect && !self.is_shutting_down() {
            launch_agent(&agent);
        }
        Some(decision)
    }

    /// One retention check per agent, each on its own task.
    pub fn tick(&self) -> Vec<JoinHandle<u64>> {
        self.fleet
            .agents()
            .into_iter()
            .map(|agent| tokio::spawn(async move { retention::check(&agent).await }))
            .collect()
    }

    /// Drop agents whose instances vanished; returns how many were removed.
    pub async fn reconcile(&self) -> usize {
        let mut removed = 0;
        for agent in self.fleet.agents() {
            if agent.reconcile().await {
                removed += 1;
            }
        }
        removed
    }

    /// (Re)launch the worker on an attached agent.
    pub fn launch(&self, id: &InstanceId) -> Option<JoinHandle<Result<(), EngineError>>> {
        if self.is_shutting_down() {
            return None;
        }
        self.fleet.get(id).map(|agent| launch_agent(&agent))
    }

    /// Stop provisioning and close every worker channel.
    ///
    /// Instances keep running so a restarted host can pick them up as orphans.
    pub async fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
        for cloud in &self.clouds {
            cloud.begin_shutdown();
        }
        let agents = self.fleet.agents();
        tracing::info!(agents = agents.len(), "shutting down, closing worker channels");
        for agent in agents {
            agent.disconnect("shutting down").await;
        }
    }
}

/// Agents to ask for: enough executors to cover `excess`, at least one,
/// capped by the cloud's per-request limit.
pub fn requested_count(excess: i64, executors: i64, max_per_request: u32) -> usize {
    let wanted = (excess / executors.max(1)).max(1);
    let cap = i64::from(max_per_request.max(1));
    wanted.min(cap) as usize
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
