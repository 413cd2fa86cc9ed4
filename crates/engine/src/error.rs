// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error types

use tender_adapters::{ComputeError, KeyError, ShellError};
use tender_core::InstanceId;
use thiserror::Error;

/// Errors from provisioning and bootstrap
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("login failed: {0}")]
    LoginFailed(String),
    #[error("client error: {0}")]
    Client(String),
    #[error("launch script failed: {0}")]
    LaunchScript(String),
    #[error("{0}")]
    Timeout(String),
    #[error("instance {0} has no reachable address")]
    NoAddress(InstanceId),
}

impl From<ComputeError> for EngineError {
    fn from(e: ComputeError) -> Self {
        match e {
            ComputeError::LoginFailed(msg) => EngineError::LoginFailed(msg),
            ComputeError::Client(msg) => EngineError::Client(msg),
        }
    }
}

impl From<ShellError> for EngineError {
    fn from(e: ShellError) -> Self {
        EngineError::Client(e.to_string())
    }
}

impl From<KeyError> for EngineError {
    fn from(e: KeyError) -> Self {
        EngineError::LoginFailed(e.to_string())
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
