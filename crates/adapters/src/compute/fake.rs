// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory control plane recording every call

use super::{ComputeError, ComputeService, CreateInstanceSpec, InstanceFilter, Operation};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tender_core::{Instance, InstanceId, InstanceStatus, NetworkInterface, OperationId};

/// Recorded control-plane call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComputeCall {
    Create { name: String },
    Start(InstanceId),
    Stop(InstanceId),
    Delete(InstanceId),
    Get(InstanceId),
    List { name: String },
}

struct FakeComputeState {
    instances: Vec<Instance>,
    calls: Vec<ComputeCall>,
    created: u32,
    created_at_ms: u64,
    create_error: Option<String>,
    start_error: Option<String>,
    get_error: Option<ComputeError>,
    status_script: HashMap<InstanceId, VecDeque<InstanceStatus>>,
    delete_delay: Duration,
    last_create: Option<CreateInstanceSpec>,
}

/// Fake compute service for testing
#[derive(Clone)]
pub struct FakeComputeService {
    inner: Arc<Mutex<FakeComputeState>>,
}

impl Default for FakeComputeService {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeComputeState {
                instances: Vec::new(),
                calls: Vec::new(),
                created: 0,
                created_at_ms: 1_000_000,
                create_error: None,
                start_error: None,
                get_error: None,
                status_script: HashMap::new(),
                delete_delay: Duration::ZERO,
                last_create: None,
            })),
        }
    }
}

impl FakeComputeService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing instance
    pub fn insert(&self, instance: Instance) {
        self.inner.lock().instances.push(instance);
    }

    pub fn instance(&self, id: &InstanceId) -> Option<Instance> {
        self.inner.lock().instances.iter().find(|i| &i.id == id).cloned()
    }

    pub fn instances(&self) -> Vec<Instance> {
        self.inner.lock().instances.clone()
    }

    pub fn set_status(&self, id: &InstanceId, status: InstanceStatus) {
        if let Some(instance) = self.inner.lock().instances.iter_mut().find(|i| &i.id == id) {
            instance.status = status;
        }
    }

    /// Remove an instance behind the orchestrator's back
    pub fn remove(&self, id: &InstanceId) {
        self.inner.lock().instances.retain(|i| &i.id != id);
    }

    /// Statuses applied one per `get` call, before the lookup
    pub fn script_statuses(&self, id: &InstanceId, statuses: Vec<InstanceStatus>) {
        self.inner.lock().status_script.insert(id.clone(), statuses.into());
    }

    /// Creation timestamp given to instances created from now on
    pub fn set_created_at_ms(&self, ms: u64) {
        self.inner.lock().created_at_ms = ms;
    }

    /// Make `create` return an operation carrying this error
    pub fn set_create_error(&self, message: impl Into<String>) {
        self.inner.lock().create_error = Some(message.into());
    }

    pub fn set_start_error(&self, message: impl Into<String>) {
        self.inner.lock().start_error = Some(message.into());
    }

    pub fn set_get_error(&self, error: Option<ComputeError>) {
        self.inner.lock().get_error = error;
    }

    pub fn set_delete_delay(&self, delay: Duration) {
        self.inner.lock().delete_delay = delay;
    }

    pub fn calls(&self) -> Vec<ComputeCall> {
        self.inner.lock().calls.clone()
    }

    pub fn last_create(&self) -> Option<CreateInstanceSpec> {
        self.inner.lock().last_create.clone()
    }

    pub fn create_count(&self) -> usize {
        self.count(|c| matches!(c, ComputeCall::Create { .. }))
    }

    pub fn start_count(&self) -> usize {
        self.count(|c| matches!(c, ComputeCall::Start(_)))
    }

    pub fn stop_count(&self) -> usize {
        self.count(|c| matches!(c, ComputeCall::Stop(_)))
    }

    pub fn delete_count(&self) -> usize {
        self.count(|c| matches!(c, ComputeCall::Delete(_)))
    }

    fn count(&self, pred: impl Fn(&ComputeCall) -> bool) -> usize {
        self.inner.lock().calls.iter().filter(|c| pred(c)).count()
    }

    fn op_for(id: &InstanceId) -> Operation {
        Operation {
            id: OperationId::new(format!("op-{}", id)),
            done: true,
            error: None,
            instance_id: Some(id.clone()),
        }
    }
}

#[async_trait]
impl ComputeService for FakeComputeService {
    async fn create(&self, spec: &CreateInstanceSpec) -> Result<Operation, ComputeError> {
        let mut state = self.inner.lock();
        state.calls.push(ComputeCall::Create { name: spec.name.clone() });
        state.last_create = Some(spec.clone());
        if let Some(message) = state.create_error.clone() {
            return Ok(Operation { error: Some(message), ..Default::default() });
        }

        state.created += 1;
        let id = InstanceId::new(format!("fake-{}", state.created));
        let instance = Instance {
            id: id.clone(),
            name: spec.name.clone(),
            folder_id: spec.folder_id.clone(),
            status: InstanceStatus::Provisioning,
            created_at_ms: state.created_at_ms,
            interfaces: vec![NetworkInterface::with_primary(format!("10.0.0.{}", state.created))],
        };
        state.instances.push(instance);
        Ok(Operation { done: false, ..Self::op_for(&id) })
    }

    async fn start(&self, id: &InstanceId) -> Result<Operation, ComputeError> {
        let mut state = self.inner.lock();
        state.calls.push(ComputeCall::Start(id.clone()));
        if let Some(message) = state.start_error.clone() {
            return Err(ComputeError::Client(message));
        }
        match state.instances.iter_mut().find(|i| &i.id == id) {
            Some(instance) => {
                instance.status = InstanceStatus::Running;
                Ok(Self::op_for(id))
            }
            None => Err(ComputeError::Client(format!("instance {} not found", id))),
        }
    }

    async fn stop(&self, id: &InstanceId) -> Result<Operation, ComputeError> {
        let mut state = self.inner.lock();
        state.calls.push(ComputeCall::Stop(id.clone()));
        match state.instances.iter_mut().find(|i| &i.id == id) {
            Some(instance) => {
                instance.status = InstanceStatus::Stopped;
                Ok(Self::op_for(id))
            }
            None => Err(ComputeError::Client(format!("instance {} not found", id))),
        }
    }

    async fn delete(&self, id: &InstanceId) -> Result<Operation, ComputeError> {
        let delay = {
            let mut state = self.inner.lock();
            state.calls.push(ComputeCall::Delete(id.clone()));
            state.delete_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.inner.lock();
        let before = state.instances.len();
        state.instances.retain(|i| &i.id != id);
        if state.instances.len() == before {
            return Err(ComputeError::Client(format!("instance {} not found", id)));
        }
        Ok(Self::op_for(id))
    }

    async fn get(&self, id: &InstanceId) -> Result<Option<Instance>, ComputeError> {
        let mut state = self.inner.lock();
        state.calls.push(ComputeCall::Get(id.clone()));
        if let Some(error) = state.get_error.clone() {
            return Err(error);
        }
        let next = state.status_script.get_mut(id).and_then(|s| s.pop_front());
        let instance = state.instances.iter_mut().find(|i| &i.id == id);
        Ok(instance.map(|instance| {
            if let Some(status) = next {
                instance.status = status;
            }
            instance.clone()
        }))
    }

    async fn list(&self, filter: &InstanceFilter) -> Result<Vec<Instance>, ComputeError> {
        let mut state = self.inner.lock();
        state.calls.push(ComputeCall::List { name: filter.name.clone() });
        Ok(state
            .instances
            .iter()
            .filter(|i| i.name == filter.name)
            .filter(|i| filter.folder_id.is_empty() || i.folder_id == filter.folder_id)
            .cloned()
            .collect())
    }
}
