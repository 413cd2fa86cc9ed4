// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tender-daemon: configuration, logging and the `tenderd` lifecycle

pub mod check;
pub mod cli;
pub mod config;
pub mod env;
pub mod lifecycle;
pub mod logging;

pub use check::{check, CheckError};
pub use config::{ConfigError, TenderConfig};
pub use lifecycle::{Config, Daemon, LifecycleError};
