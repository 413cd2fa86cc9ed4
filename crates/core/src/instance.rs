// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot of a remote compute instance as reported by the control plane

use crate::InstanceId;
use serde::{Deserialize, Serialize};

/// Address reported for interfaces that have not been assigned one yet
pub const UNSPECIFIED_ADDRESS: &str = "0.0.0.0";

/// Lifecycle status of a compute instance.
///
/// Only `Running`, `Provisioning` and `Stopped` drive orchestration decisions;
/// the rest are carried so logs show what the control plane reported.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InstanceStatus {
    Provisioning,
    Running,
    Stopping,
    Stopped,
    Starting,
    Restarting,
    Updating,
    Error,
    Crashed,
    Deleting,
    Other(String),
}

impl InstanceStatus {
    /// Parse a status string, ignoring case.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "PROVISIONING" => Self::Provisioning,
            "RUNNING" => Self::Running,
            "STOPPING" => Self::Stopping,
            "STOPPED" => Self::Stopped,
            "STARTING" => Self::Starting,
            "RESTARTING" => Self::Restarting,
            "UPDATING" => Self::Updating,
            "ERROR" => Self::Error,
            "CRASHED" => Self::Crashed,
            "DELETING" => Self::Deleting,
            _ => Self::Other(s.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Provisioning => "PROVISIONING",
            Self::Running => "RUNNING",
            Self::Stopping => "STOPPING",
            Self::Stopped => "STOPPED",
            Self::Starting => "STARTING",
            Self::Restarting => "RESTARTING",
            Self::Updating => "UPDATING",
            Self::Error => "ERROR",
            Self::Crashed => "CRASHED",
            Self::Deleting => "DELETING",
            Self::Other(s) => s,
        }
    }

    /// Instances in these states are never picked up for reuse.
    pub fn is_unusable(&self) -> bool {
        matches!(self, Self::Deleting | Self::Error | Self::Crashed)
    }
}

impl From<String> for InstanceStatus {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<InstanceStatus> for String {
    fn from(status: InstanceStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One network interface of an instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInterface {
    /// Primary internal IPv4 address
    pub primary_v4: Option<String>,
    /// One-to-one NAT (public) IPv4 address
    pub nat_v4: Option<String>,
}

impl NetworkInterface {
    pub fn with_primary(address: impl Into<String>) -> Self {
        Self { primary_v4: Some(address.into()), nat_v4: None }
    }

    pub fn with_nat(primary: impl Into<String>, nat: impl Into<String>) -> Self {
        Self { primary_v4: Some(primary.into()), nat_v4: Some(nat.into()) }
    }
}

/// Point-in-time view of a remote instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub id: InstanceId,
    pub name: String,
    pub folder_id: String,
    pub status: InstanceStatus,
    /// Creation time in epoch milliseconds
    pub created_at_ms: u64,
    pub interfaces: Vec<NetworkInterface>,
}

impl Instance {
    /// Address to reach the instance on: the first interface's NAT address
    /// when one is assigned, otherwise its primary address.
    pub fn host_address(&self) -> Option<&str> {
        let nic = self.interfaces.first()?;
        let nat = nic.nat_v4.as_deref().filter(|a| !a.is_empty());
        nat.or(nic.primary_v4.as_deref()).filter(|a| !a.is_empty())
    }

    /// Milliseconds since creation, saturating at zero for clock skew.
    pub fn uptime_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.created_at_ms)
    }
}

crate::builder! {
    pub struct InstanceBuilder => Instance {
        into {
            id: InstanceId = "inst-1",
            name: String = "worker",
            folder_id: String = "folder-1",
        }
        set {
            status: InstanceStatus = InstanceStatus::Running,
            created_at_ms: u64 = 1_000_000,
            interfaces: Vec<NetworkInterface> = vec![NetworkInterface::with_primary("10.0.0.5")],
        }
    }
}

#[cfg(test)]
#[path = "instance_tests.rs"]
mod tests;
