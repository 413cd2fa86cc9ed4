// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{CloudConfig, SshConfig, TemplateConfig, WorkerConfig};
use std::path::PathBuf;

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for core types.
pub mod strategies {
    use crate::{IdleTermination, InstanceStatus};
    use proptest::prelude::*;

    pub fn arb_instance_status() -> impl Strategy<Value = InstanceStatus> {
        prop_oneof![
            Just(InstanceStatus::Provisioning),
            Just(InstanceStatus::Running),
            Just(InstanceStatus::Stopping),
            Just(InstanceStatus::Stopped),
            Just(InstanceStatus::Starting),
            Just(InstanceStatus::Error),
            Just(InstanceStatus::Deleting),
        ]
    }

    pub fn arb_idle_termination() -> impl Strategy<Value = IdleTermination> {
        (-120i64..=120).prop_map(IdleTermination::from_minutes)
    }
}

// ── Config factories ────────────────────────────────────────────────────

/// A cloud with the given templates and default tuning.
pub fn cloud_config(name: &str, templates: Vec<TemplateConfig>) -> CloudConfig {
    CloudConfig {
        name: name.to_string(),
        credentials_file: PathBuf::from("/nonexistent/sa.json"),
        ssh: SshConfig {
            private_key_file: PathBuf::from("/nonexistent/id_rsa"),
            username: "builder".to_string(),
        },
        auth_sleep_ms: 0,
        compute_endpoint: "http://127.0.0.1:9".to_string(),
        iam_endpoint: "http://127.0.0.1:9/iam/v1/tokens".to_string(),
        max_per_request: 1,
        worker: WorkerConfig::default(),
        templates,
    }
}
