// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry of agents bound to live instances

use crate::agent::Agent;
use parking_lot::Mutex;
use std::sync::Arc;
use tender_core::{Clock, InstanceId};

/// The host's view of which instances are serving as agents
pub trait FleetRegistry<C: Clock>: Send + Sync + 'static {
    fn agents(&self) -> Vec<Arc<Agent<C>>>;

    /// Bind `agent`, replacing any existing binding for the same instance.
    fn add(&self, agent: Arc<Agent<C>>);

    fn remove(&self, id: &InstanceId) -> Option<Arc<Agent<C>>>;

    fn get(&self, id: &InstanceId) -> Option<Arc<Agent<C>>>;

    fn contains(&self, id: &InstanceId) -> bool {
        self.get(id).is_some()
    }
}

/// Fleet kept in process memory, in attach order
pub struct InMemoryFleet<C: Clock> {
    agents: Mutex<Vec<Arc<Agent<C>>>>,
}

impl<C: Clock> Default for InMemoryFleet<C> {
    fn default() -> Self {
        Self { agents: Mutex::new(Vec::new()) }
    }
}

impl<C: Clock> InMemoryFleet<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.agents.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.lock().is_empty()
    }
}

impl<C: Clock> FleetRegistry<C> for InMemoryFleet<C> {
    fn agents(&self) -> Vec<Arc<Agent<C>>> {
        self.agents.lock().clone()
    }

    fn add(&self, agent: Arc<Agent<C>>) {
        let mut agents = self.agents.lock();
        match agents.iter_mut().find(|a| a.id() == agent.id()) {
            Some(existing) => *existing = agent,
            None => agents.push(agent),
        }
    }

    fn remove(&self, id: &InstanceId) -> Option<Arc<Agent<C>>> {
        let mut agents = self.agents.lock();
        let index = agents.iter().position(|a| a.id() == id)?;
        Some(agents.remove(index))
    }

    fn get(&self, id: &InstanceId) -> Option<Arc<Agent<C>>> {
        self.agents.lock().iter().find(|a| a.id() == id).cloned()
    }
}

#[cfg(test)]
#[path = "fleet_tests.rs"]
mod tests;
