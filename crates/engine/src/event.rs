// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fleet lifecycle events emitted to the host

use tender_core::InstanceId;

/// Something the host scheduler may want to react to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FleetEvent {
    /// Instance reached `RUNNING` and joined the fleet
    AgentAttached { instance_id: InstanceId, template: String },
    /// Worker process is up and its channel is live
    AgentConnected { instance_id: InstanceId },
    /// Bootstrap failed; work waiting on this agent should be requeued
    LaunchFailed { instance_id: InstanceId, error: String },
    /// Provisioning failed; work waiting on `label` should be cancelled
    ProvisionFailed { cloud: String, template: String, label: Option<String>, error: String },
    AgentTerminated { instance_id: InstanceId },
    AgentStopped { instance_id: InstanceId },
}

impl FleetEvent {
    pub fn name(&self) -> &'static str {
        match self {
            FleetEvent::AgentAttached { .. } => "agent:attached",
            FleetEvent::AgentConnected { .. } => "agent:connected",
            FleetEvent::LaunchFailed { .. } => "agent:launch_failed",
            FleetEvent::ProvisionFailed { .. } => "provision:failed",
            FleetEvent::AgentTerminated { .. } => "agent:terminated",
            FleetEvent::AgentStopped { .. } => "agent:stopped",
        }
    }

    pub fn instance_id(&self) -> Option<&InstanceId> {
        match self {
            FleetEvent::AgentAttached { instance_id, .. }
            | FleetEvent::AgentConnected { instance_id }
            | FleetEvent::LaunchFailed { instance_id, .. }
            | FleetEvent::AgentTerminated { instance_id }
            | FleetEvent::AgentStopped { instance_id } => Some(instance_id),
            FleetEvent::ProvisionFailed { .. } => None,
        }
    }

    pub fn log_summary(&self) -> String {
        let t = self.name();
        match self {
            FleetEvent::AgentAttached { instance_id, template } => {
                format!("{t} instance={instance_id} template={template}")
            }
            FleetEvent::LaunchFailed { instance_id, error } => {
                format!("{t} instance={instance_id} error={error}")
            }
            FleetEvent::ProvisionFailed { cloud, template, label, error } => {
                let label = label.as_deref().unwrap_or("-");
                format!("{t} cloud={cloud} template={template} label={label} error={error}")
            }
            FleetEvent::AgentConnected { instance_id }
            | FleetEvent::AgentTerminated { instance_id }
            | FleetEvent::AgentStopped { instance_id } => format!("{t} instance={instance_id}"),
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
