// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tender-core: data model and primitives shared by the tender crates

pub mod macros;

pub mod clock;
pub mod cloud;
pub mod id;
pub mod instance;
pub mod latch;
pub mod template;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use cloud::{CloudConfig, SshConfig, WorkerConfig, DEFAULT_AUTH_SLEEP_MS};
pub use id::{InstanceId, OperationId};
pub use instance::{Instance, InstanceStatus, NetworkInterface, UNSPECIFIED_ADDRESS};
#[cfg(any(test, feature = "test-support"))]
pub use instance::InstanceBuilder;
pub use latch::{TerminationGuard, TerminationLatch};
pub use template::{IdleTermination, TemplateConfig, TemplateError, TemplateMode};
#[cfg(any(test, feature = "test-support"))]
pub use template::TemplateConfigBuilder;
