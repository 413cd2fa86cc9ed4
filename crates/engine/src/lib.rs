// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tender-engine: instance lifecycle orchestration.
//!
//! Provision → wait for `RUNNING` → bootstrap over SSH → serve → evict.

mod agent;
pub mod bootstrap;
mod cloud;
mod config;
mod error;
mod event;
mod fleet;
mod orchestrator;
pub mod provision;
pub mod readiness;
pub mod retention;
pub mod termination;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use agent::{Agent, ConnectionState, MIN_FETCH_INTERVAL_MS};
pub use bootstrap::{BootstrapLauncher, INIT_MARKER};
pub use cloud::{CloudRuntime, RuntimeDeps};
pub use config::{EngineConfig, ReadinessConfig};
pub use error::EngineError;
pub use event::FleetEvent;
pub use fleet::{FleetRegistry, InMemoryFleet};
pub use orchestrator::{launch_agent, Orchestrator, PlannedAgent};
pub use provision::{provision, ProvisionOptions};
pub use readiness::{await_running, ReadinessState};
pub use retention::StartDecision;
