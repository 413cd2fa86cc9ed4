// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compute control-plane adapter.
//!
//! # Module layout
//!
//! - [`rest`]: JSON/HTTPS client authenticated through a [`TokenCache`](crate::TokenCache)
//! - `fake`: in-memory control plane for tests (behind `test-support`)

pub mod rest;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tender_core::{Instance, InstanceId, OperationId};
use thiserror::Error;

/// Errors from control-plane calls
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ComputeError {
    /// Credentials could not be loaded or exchanged for a token
    #[error("login failed: {0}")]
    LoginFailed(String),
    /// The API rejected the call or the transport failed
    #[error("client error: {0}")]
    Client(String),
}

/// Handle to an asynchronous control-plane operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Operation {
    pub id: OperationId,
    pub done: bool,
    pub error: Option<String>,
    /// Instance the operation acts on, when the API reports it
    pub instance_id: Option<InstanceId>,
}

impl Operation {
    /// The operation's error text, if it carries a non-empty one
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref().filter(|m| !m.trim().is_empty())
    }
}

/// Selects the instances belonging to one template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceFilter {
    pub folder_id: String,
    pub name: String,
}

impl InstanceFilter {
    pub fn by_name(folder_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { folder_id: folder_id.into(), name: name.into() }
    }

    /// Filter expression understood by the list endpoint
    pub fn expression(&self) -> String {
        format!("name=\"{}\"", self.name)
    }
}

/// A create-instance request: the template's opaque body plus identity fields
#[derive(Debug, Clone, PartialEq)]
pub struct CreateInstanceSpec {
    pub folder_id: String,
    pub name: String,
    /// Cloud-init document placed in `metadata["user-data"]`
    pub user_data: String,
    pub body: Value,
}

impl CreateInstanceSpec {
    /// Merge identity fields into the body without dropping other metadata.
    pub fn to_request(&self) -> Value {
        let mut request = match &self.body {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        request.insert("name".to_string(), Value::String(self.name.clone()));
        if !self.folder_id.is_empty() {
            request.insert("folderId".to_string(), Value::String(self.folder_id.clone()));
        }
        let metadata = request
            .entry("metadata".to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !metadata.is_object() {
            *metadata = Value::Object(Map::new());
        }
        if let Value::Object(metadata) = metadata {
            metadata.insert("user-data".to_string(), Value::String(self.user_data.clone()));
        }
        Value::Object(request)
    }
}

/// Remote compute API
#[async_trait]
pub trait ComputeService: Send + Sync + 'static {
    async fn create(&self, spec: &CreateInstanceSpec) -> Result<Operation, ComputeError>;

    async fn start(&self, id: &InstanceId) -> Result<Operation, ComputeError>;

    async fn stop(&self, id: &InstanceId) -> Result<Operation, ComputeError>;

    async fn delete(&self, id: &InstanceId) -> Result<Operation, ComputeError>;

    /// `Ok(None)` when the instance does not exist.
    async fn get(&self, id: &InstanceId) -> Result<Option<Instance>, ComputeError>;

    /// Matching instances in API order.
    async fn list(&self, filter: &InstanceFilter) -> Result<Vec<Instance>, ComputeError>;
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake;

#[cfg(any(test, feature = "test-support"))]
pub use fake::{ComputeCall, FakeComputeService};

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
