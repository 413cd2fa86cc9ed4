// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for the engine crate.

use crate::agent::Agent;
use crate::{CloudRuntime, EngineConfig, FleetEvent, FleetRegistry, InMemoryFleet, RuntimeDeps};
use std::sync::Arc;
use tender_adapters::{
    FakeComputeService, FakeRemoteShell, KeyProvider, PrivateKey, StaticKeyProvider,
};
use tender_core::test_support::cloud_config;
use tender_core::{CloudConfig, FakeClock, Instance, InstanceStatus, NetworkInterface, TemplateConfig};
use tokio::sync::mpsc;

pub(crate) const TEST_KEY: &str = include_str!("../../adapters/src/identity/testdata/rsa3072.pem");

pub(crate) fn test_key() -> PrivateKey {
    PrivateKey::new(TEST_KEY, "builder").unwrap()
}

/// Test context holding the cloud runtime, its fakes and the event receiver.
pub(crate) struct TestContext {
    pub cloud: Arc<CloudRuntime<FakeClock>>,
    pub fleet: Arc<InMemoryFleet<FakeClock>>,
    pub compute: FakeComputeService,
    pub shell: FakeRemoteShell,
    pub clock: FakeClock,
    pub event_rx: mpsc::Receiver<FleetEvent>,
}

/// One cloud with a single default template and the RSA test key.
pub(crate) fn setup() -> TestContext {
    setup_with(vec![TemplateConfig::builder().build()], EngineConfig::default())
}

pub(crate) fn setup_with(templates: Vec<TemplateConfig>, engine: EngineConfig) -> TestContext {
    setup_with_keys(templates, engine, Arc::new(StaticKeyProvider::new(test_key())))
}

pub(crate) fn setup_with_keys(
    templates: Vec<TemplateConfig>,
    engine: EngineConfig,
    keys: Arc<dyn KeyProvider>,
) -> TestContext {
    setup_cloud(cloud_config("test-cloud", templates), engine, keys)
}

pub(crate) fn setup_cloud(
    config: CloudConfig,
    engine: EngineConfig,
    keys: Arc<dyn KeyProvider>,
) -> TestContext {
    let compute = FakeComputeService::new();
    let shell = FakeRemoteShell::new();
    let clock = FakeClock::new();
    let fleet = Arc::new(InMemoryFleet::new());
    let (event_tx, event_rx) = mpsc::channel(100);
    let cloud = CloudRuntime::new(
        config,
        RuntimeDeps { compute: Arc::new(compute.clone()), shell: Arc::new(shell.clone()), keys },
        Arc::clone(&fleet) as Arc<dyn FleetRegistry<FakeClock>>,
        engine,
        clock.clone(),
        event_tx,
    );
    TestContext { cloud, fleet, compute, shell, clock, event_rx }
}

/// A `ci-worker` instance in the default folder, reachable on `10.0.0.<n>`.
pub(crate) fn worker_instance(id: &str, status: InstanceStatus) -> Instance {
    let host = format!("10.0.0.{}", id.bytes().map(u32::from).sum::<u32>() % 250 + 1);
    Instance::builder()
        .id(id)
        .name("ci-worker")
        .status(status)
        .interfaces(vec![NetworkInterface::with_primary(host)])
        .build()
}

impl TestContext {
    pub(crate) fn template(&self) -> Arc<TemplateConfig> {
        Arc::clone(&self.cloud.templates()[0])
    }

    /// Seed `instance` remotely and bind it into the fleet.
    pub(crate) fn attach(&self, instance: Instance) -> Arc<Agent<FakeClock>> {
        self.compute.insert(instance.clone());
        let agent = self.cloud.bind_agent(self.template(), instance);
        self.fleet.add(Arc::clone(&agent));
        agent
    }

    /// Seed a running instance, bind it, and mark its worker online.
    pub(crate) fn attach_online(&self, id: &str) -> Arc<Agent<FakeClock>> {
        let agent = self.attach(worker_instance(id, InstanceStatus::Running));
        agent.on_connected();
        agent
    }

    /// Let spawned tasks run, then collect every event emitted so far.
    pub(crate) async fn drain_events(&mut self) -> Vec<FleetEvent> {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        let mut events = Vec::new();
        while let Ok(event) = self.event_rx.try_recv() {
            events.push(event);
        }
        events
    }
}
