// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Instance teardown.
//!
//! At most one termination task runs per agent: [`terminate`] arms the
//! agent's latch and the returned task releases it on every exit path.

use crate::agent::Agent;
use crate::FleetEvent;
use std::sync::Arc;
use tender_core::Clock;
use tokio::task::JoinHandle;

/// Delete the agent's instance and drop it from the fleet.
///
/// Returns `None` when a termination is already in flight.
pub fn terminate<C: Clock>(agent: &Arc<Agent<C>>) -> Option<JoinHandle<()>> {
    let Some(guard) = agent.latch().try_begin() else {
        tracing::debug!(instance_id = %agent.id(), "termination already scheduled");
        return None;
    };
    let agent = Arc::clone(agent);
    Some(tokio::spawn(async move {
        let _guard = guard;
        run(&agent).await;
    }))
}

async fn run<C: Clock>(agent: &Arc<Agent<C>>) {
    let id = agent.id();
    let cloud = agent.cloud();
    let alive = match agent.is_alive(true).await {
        Ok(alive) => alive,
        Err(e) => {
            tracing::warn!(instance_id = %id, error = %e, "failed to check instance, deleting anyway");
            true
        }
    };

    if alive {
        match cloud.compute().delete(id).await {
            Ok(op) => {
                if let Some(message) = op.error_message() {
                    tracing::warn!(instance_id = %id, error = message, "failed to terminate instance");
                    return;
                }
            }
            Err(e) => {
                tracing::warn!(instance_id = %id, error = %e, "failed to terminate instance");
                return;
            }
        }
    } else {
        tracing::info!(instance_id = %id, "instance already terminated");
    }

    agent.disconnect("terminated").await;
    cloud.fleet().remove(id);
    tracing::info!(instance_id = %id, "removed instance from fleet");
    cloud.emit(FleetEvent::AgentTerminated { instance_id: id.clone() }).await;
}

/// Stop the agent's instance and disconnect it; the agent stays registered.
pub async fn stop<C: Clock>(agent: &Arc<Agent<C>>) {
    let id = agent.id();
    let cloud = agent.cloud();
    match cloud.compute().stop(id).await {
        Ok(op) => {
            if let Some(message) = op.error_message() {
                tracing::warn!(instance_id = %id, error = message, "failed to stop instance");
                return;
            }
        }
        Err(e) => {
            tracing::warn!(instance_id = %id, error = %e, "failed to stop instance");
            return;
        }
    }
    agent.disconnect("stopped").await;
    tracing::info!(instance_id = %id, "stopped instance");
    cloud.emit(FleetEvent::AgentStopped { instance_id: id.clone() }).await;
}

#[cfg(test)]
#[path = "termination_tests.rs"]
mod tests;
