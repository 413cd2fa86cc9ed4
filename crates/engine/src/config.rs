// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine tuning knobs

use std::time::Duration;

/// How the readiness waiter polls a new instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessConfig {
    pub poll_interval: Duration,
    /// Non-provisioning observations tolerated before giving up
    pub stuck_limit: u32,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self { poll_interval: Duration::from_secs(10), stuck_limit: 5 }
    }
}

impl ReadinessConfig {
    tender_core::setters! {
        set {
            poll_interval: Duration,
            stuck_limit: u32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub readiness: ReadinessConfig,
    /// Sleep between SSH authentication attempts during bootstrap
    pub retry_interval: Duration,
    /// Sleep while waiting for SSH to come up
    pub connect_retry: Duration,
    pub connect_timeout: Duration,
    pub ssh_port: u16,
    pub max_concurrent_launches: usize,
    /// Never reclaim idle agents
    pub retention_disabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            readiness: ReadinessConfig::default(),
            retry_interval: Duration::from_secs(30),
            connect_retry: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(10),
            ssh_port: 22,
            max_concurrent_launches: 8,
            retention_disabled: false,
        }
    }
}

impl EngineConfig {
    tender_core::setters! {
        set {
            readiness: ReadinessConfig,
            retry_interval: Duration,
            connect_retry: Duration,
            connect_timeout: Duration,
            ssh_port: u16,
            max_concurrent_launches: usize,
            retention_disabled: bool,
        }
    }
}
