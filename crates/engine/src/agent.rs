// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A provisioned instance bound into the fleet

use crate::retention::RetentionState;
use crate::{CloudRuntime, FleetEvent};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tender_adapters::{ComputeError, WorkerChannel};
use tender_core::{Clock, Instance, InstanceId, InstanceStatus, TemplateConfig, TerminationLatch};

/// Cached instance data is reused for this long unless a fetch is forced
pub const MIN_FETCH_INTERVAL_MS: u64 = 20_000;

/// Connection state of an agent's worker channel.
///
/// Agents start `Offline` with a blank cause; only a launch moves them to
/// `Connecting`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Online,
    Offline { cause: String },
}

struct AgentState {
    connection: ConnectionState,
    busy: u32,
    idle_since_ms: u64,
    snapshot: Option<Instance>,
    fetched_at_ms: Option<u64>,
}

pub struct Agent<C: Clock> {
    id: InstanceId,
    name: String,
    template: Arc<TemplateConfig>,
    cloud: Arc<CloudRuntime<C>>,
    latch: Arc<TerminationLatch>,
    connected: AtomicBool,
    /// Cleared when a launch fails, set again once the worker connects
    accepting: AtomicBool,
    state: Mutex<AgentState>,
    channel: tokio::sync::Mutex<Option<WorkerChannel>>,
    pub(crate) retention: tokio::sync::Mutex<RetentionState>,
}

impl<C: Clock> Agent<C> {
    pub fn new(template: Arc<TemplateConfig>, cloud: Arc<CloudRuntime<C>>, instance: Instance) -> Self {
        let now = cloud.now_ms();
        Self {
            id: instance.id.clone(),
            name: instance.name.clone(),
            template,
            cloud,
            latch: TerminationLatch::new(),
            connected: AtomicBool::new(false),
            accepting: AtomicBool::new(true),
            state: Mutex::new(AgentState {
                connection: ConnectionState::Offline { cause: String::new() },
                busy: 0,
                idle_since_ms: now,
                snapshot: Some(instance),
                fetched_at_ms: Some(now),
            }),
            channel: tokio::sync::Mutex::new(None),
            retention: tokio::sync::Mutex::new(RetentionState::default()),
        }
    }

    pub fn id(&self) -> &InstanceId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> &Arc<TemplateConfig> {
        &self.template
    }

    pub fn cloud(&self) -> &Arc<CloudRuntime<C>> {
        &self.cloud
    }

    pub fn latch(&self) -> &Arc<TerminationLatch> {
        &self.latch
    }

    /// False while a termination task is in flight or after a failed launch
    pub fn is_accepting_tasks(&self) -> bool {
        self.accepting.load(Ordering::SeqCst) && self.latch.is_accepting_tasks()
    }

    pub fn set_accepting_tasks(&self, accepting: bool) {
        self.accepting.store(accepting, Ordering::SeqCst);
    }

    /// Take the agent out of service after its worker failed to launch.
    ///
    /// The agent stays registered; retention decides when to reclaim it.
    pub fn launch_failed(&self, cause: impl Into<String>) {
        self.set_accepting_tasks(false);
        self.set_offline(cause);
    }

    // ── Connection state ────────────────────────────────────────────────

    pub fn connection(&self) -> ConnectionState {
        self.state.lock().connection.clone()
    }

    pub fn is_connecting(&self) -> bool {
        self.state.lock().connection == ConnectionState::Connecting
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Why the agent went offline, if it did
    pub fn offline_cause(&self) -> Option<String> {
        match &self.state.lock().connection {
            ConnectionState::Offline { cause } if !cause.is_empty() => Some(cause.clone()),
            _ => None,
        }
    }

    pub fn set_connecting(&self) {
        self.state.lock().connection = ConnectionState::Connecting;
    }

    pub fn set_offline(&self, cause: impl Into<String>) {
        self.connected.store(false, Ordering::SeqCst);
        self.state.lock().connection = ConnectionState::Offline { cause: cause.into() };
    }

    pub fn on_connected(&self) {
        self.connected.store(true, Ordering::SeqCst);
        self.accepting.store(true, Ordering::SeqCst);
        let now = self.cloud.now_ms();
        let mut state = self.state.lock();
        state.connection = ConnectionState::Online;
        state.idle_since_ms = now;
    }

    // ── Executor accounting ─────────────────────────────────────────────

    pub fn busy(&self) -> u32 {
        self.state.lock().busy
    }

    pub fn is_idle(&self) -> bool {
        self.busy() == 0
    }

    pub fn task_started(&self) {
        self.state.lock().busy += 1;
    }

    pub fn task_finished(&self) {
        let now = self.cloud.now_ms();
        let mut state = self.state.lock();
        state.busy = state.busy.saturating_sub(1);
        if state.busy == 0 {
            state.idle_since_ms = now;
        }
    }

    /// Milliseconds since the last executor went idle (0 while busy)
    pub fn idle_ms(&self, now_ms: u64) -> u64 {
        let state = self.state.lock();
        if state.busy > 0 {
            return 0;
        }
        now_ms.saturating_sub(state.idle_since_ms)
    }

    // ── Live instance data ──────────────────────────────────────────────

    /// Last fetched instance snapshot without touching the API
    pub fn cached_instance(&self) -> Option<Instance> {
        self.state.lock().snapshot.clone()
    }

    /// Instance data, refreshed when `force` or when the cache is stale.
    pub async fn instance(&self, force: bool) -> Result<Option<Instance>, ComputeError> {
        let now = self.cloud.now_ms();
        if !force {
            let state = self.state.lock();
            let fresh = state
                .fetched_at_ms
                .is_some_and(|at| now.saturating_sub(at) < MIN_FETCH_INTERVAL_MS);
            if fresh {
                return Ok(state.snapshot.clone());
            }
        }

        let fetched = self.cloud.compute().get(&self.id).await?;
        let mut state = self.state.lock();
        state.fetched_at_ms = Some(now);
        state.snapshot = fetched.clone();
        Ok(fetched)
    }

    /// False when the instance no longer exists or is stopped.
    pub async fn is_alive(&self, force: bool) -> Result<bool, ComputeError> {
        Ok(self
            .instance(force)
            .await?
            .is_some_and(|i| i.status != InstanceStatus::Stopped))
    }

    /// Drop the agent when its instance disappeared behind our back.
    ///
    /// Returns true when the agent was removed.
    pub async fn reconcile(self: &Arc<Self>) -> bool {
        match self.instance(true).await {
            Ok(Some(_)) => false,
            Ok(None) => {
                tracing::info!(instance_id = %self.id, "instance terminated externally");
                self.disconnect("instance terminated externally").await;
                self.cloud.fleet().remove(&self.id);
                self.cloud.emit(FleetEvent::AgentTerminated { instance_id: self.id.clone() }).await;
                true
            }
            Err(e) => {
                tracing::debug!(instance_id = %self.id, error = %e, "reconcile skipped");
                false
            }
        }
    }

    // ── Worker channel ──────────────────────────────────────────────────

    pub async fn attach_channel(&self, channel: WorkerChannel) {
        if let Some(previous) = self.channel.lock().await.replace(channel) {
            previous.close().await;
        }
    }

    /// Hand the live channel to the caller (e.g. the host's protocol driver).
    pub async fn take_channel(&self) -> Option<WorkerChannel> {
        self.channel.lock().await.take()
    }

    pub async fn has_channel(&self) -> bool {
        self.channel.lock().await.is_some()
    }

    /// Close the worker channel and mark the agent offline.
    pub async fn disconnect(&self, cause: &str) {
        let channel = self.channel.lock().await.take();
        if let Some(channel) = channel {
            channel.close().await;
        }
        self.set_offline(cause);
    }
}

impl<C: Clock> std::fmt::Debug for Agent<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("template", &self.template.name)
            .field("cloud", &self.cloud.name())
            .finish()
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
