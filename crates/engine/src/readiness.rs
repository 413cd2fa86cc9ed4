// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Poll a freshly provisioned instance until it reports `RUNNING`.

use crate::agent::Agent;
use crate::{orchestrator, FleetEvent};
use std::sync::Arc;
use tender_core::{Clock, InstanceStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessState {
    Polling,
    Running,
    Failed,
}

/// What one poll saw
enum Observation<'a> {
    Gone,
    Status(&'a InstanceStatus),
    /// The API call failed
    Unknown,
}

fn observe(observation: Observation<'_>, stuck: &mut u32, stuck_limit: u32) -> ReadinessState {
    match observation {
        Observation::Gone => ReadinessState::Failed,
        Observation::Status(InstanceStatus::Running) => ReadinessState::Running,
        Observation::Status(InstanceStatus::Provisioning) => ReadinessState::Polling,
        Observation::Status(_) | Observation::Unknown if *stuck >= stuck_limit => {
            ReadinessState::Failed
        }
        Observation::Status(_) | Observation::Unknown => {
            *stuck += 1;
            ReadinessState::Polling
        }
    }
}

/// Wait for `agent`'s instance to run, then attach it and request a launch.
///
/// Returns `None` if the instance vanished or stayed in an unexpected state
/// for more than `stuck_limit` polls.
pub async fn await_running<C: Clock>(agent: Arc<Agent<C>>) -> Option<Arc<Agent<C>>> {
    let cloud = Arc::clone(agent.cloud());
    let config = cloud.engine().readiness;
    let started = tokio::time::Instant::now();
    let mut stuck = 0;

    let outcome = loop {
        let state = match agent.instance(true).await {
            Ok(Some(instance)) => {
                let state =
                    observe(Observation::Status(&instance.status), &mut stuck, config.stuck_limit);
                if state == ReadinessState::Polling && instance.status != InstanceStatus::Provisioning
                {
                    tracing::info!(
                        instance_id = %agent.id(),
                        attempt = stuck,
                        status = %instance.status,
                        "instance is neither provisioning nor running, will try again"
                    );
                }
                state
            }
            Ok(None) => {
                tracing::warn!(instance_id = %agent.id(), "instance not found, abandoning provisioning");
                observe(Observation::Gone, &mut stuck, config.stuck_limit)
            }
            Err(e) => {
                let state = observe(Observation::Unknown, &mut stuck, config.stuck_limit);
                tracing::info!(instance_id = %agent.id(), attempt = stuck, error = %e, "failed to poll instance");
                state
            }
        };

        match state {
            ReadinessState::Polling => tokio::time::sleep(config.poll_interval).await,
            ReadinessState::Running => break true,
            ReadinessState::Failed => {
                if stuck >= config.stuck_limit {
                    tracing::warn!(
                        instance_id = %agent.id(),
                        attempts = stuck,
                        "instance did not move to running, abandoning provisioning"
                    );
                }
                break false;
            }
        }
    };

    cloud.clear_pending(agent.id());
    if !outcome {
        return None;
    }

    tracing::info!(
        instance_id = %agent.id(),
        elapsed_secs = started.elapsed().as_secs(),
        "instance is running and ready to be connected"
    );
    cloud.fleet().add(Arc::clone(&agent));
    cloud
        .emit(FleetEvent::AgentAttached {
            instance_id: agent.id().clone(),
            template: agent.template().name.clone(),
        })
        .await;

    if agent.template().connect_on_start && !cloud.is_shutting_down() {
        orchestrator::launch_agent(&agent);
    }
    Some(agent)
}

#[cfg(test)]
#[path = "readiness_tests.rs"]
mod tests;
