// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tender_adapters::{FakeComputeService, FakeRemoteShell, PrivateKey, StaticKeyProvider};
use tender_core::test_support::cloud_config;
use tender_core::{FakeClock, Instance, InstanceId, InstanceStatus, TemplateConfig};
use tender_engine::{EngineConfig, RuntimeDeps};

use crate::config::TenderConfig;

const TEST_KEY: &str = include_str!("../../../adapters/src/identity/testdata/rsa3072.pem");

struct Harness {
    daemon: Daemon<FakeClock>,
    compute: FakeComputeService,
}

fn harness(clouds: &[&str]) -> Harness {
    let config = TenderConfig {
        clouds: clouds
            .iter()
            .map(|name| cloud_config(name, vec![TemplateConfig::builder().build()]))
            .collect(),
    };
    let compute = FakeComputeService::new();
    let shell = FakeRemoteShell::new();
    let key = PrivateKey::new(TEST_KEY, "builder").unwrap();
    let deps = RuntimeDeps {
        compute: Arc::new(compute.clone()),
        shell: Arc::new(shell),
        keys: Arc::new(StaticKeyProvider::new(key)),
    };
    let daemon = startup_with(&config, EngineConfig::default(), FakeClock::new(), |_| deps.clone());
    Harness { daemon, compute }
}

#[test]
fn registers_every_configured_cloud() {
    let h = harness(&["east", "west"]);

    let names: Vec<&str> = h.daemon.orchestrator().clouds().iter().map(|c| c.name()).collect();
    assert_eq!(names, vec!["east", "west"]);
    assert!(h.daemon.orchestrator().fleet().agents().is_empty());
}

#[tokio::test]
async fn initial_provision_creates_capacity() {
    let h = harness(&["east"]);

    h.daemon.provision(Some("linux"), 1).await;

    assert_eq!(h.compute.create_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn tick_drops_vanished_instances_then_shuts_down() {
    let h = harness(&["east"]);
    let orchestrator = Arc::clone(h.daemon.orchestrator());
    let cloud = Arc::clone(orchestrator.cloud("east").unwrap());
    let instance = Instance::builder()
        .id("fhm1")
        .name("ci-worker")
        .status(InstanceStatus::Running)
        .build();
    let agent = cloud.bind_agent(Arc::clone(&cloud.templates()[0]), instance);
    orchestrator.fleet().add(agent);

    h.daemon
        .run(Duration::from_secs(1), tokio::time::sleep(Duration::from_millis(1500)))
        .await;

    assert!(!orchestrator.fleet().contains(&InstanceId::from("fhm1")));
    assert!(orchestrator.is_shutting_down());
    assert!(cloud.is_shutting_down());
}

#[tokio::test(start_paused = true)]
async fn shutdown_leaves_instances_running() {
    let h = harness(&["east"]);
    let orchestrator = Arc::clone(h.daemon.orchestrator());
    let cloud = Arc::clone(orchestrator.cloud("east").unwrap());
    let instance = Instance::builder()
        .id("fhm1")
        .name("ci-worker")
        .status(InstanceStatus::Running)
        .build();
    h.compute.insert(instance.clone());
    orchestrator.fleet().add(cloud.bind_agent(Arc::clone(&cloud.templates()[0]), instance));

    h.daemon.run(Duration::from_secs(60), std::future::ready(())).await;

    assert_eq!(h.compute.delete_count(), 0);
    assert!(orchestrator.fleet().contains(&InstanceId::from("fhm1")));
    assert!(orchestrator.provision(Some("linux"), 1).await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn event_backlog_larger_than_the_buffer_does_not_stall_the_loop() {
    let h = harness(&["east"]);
    let orchestrator = Arc::clone(h.daemon.orchestrator());
    let cloud = Arc::clone(orchestrator.cloud("east").unwrap());
    let template = Arc::clone(&cloud.templates()[0]);
    for n in 0..=EVENT_BUFFER {
        let instance = Instance::builder()
            .id(format!("fhm{n}"))
            .name("ci-worker")
            .status(InstanceStatus::Running)
            .build();
        orchestrator.fleet().add(cloud.bind_agent(Arc::clone(&template), instance));
    }

    let run = h
        .daemon
        .run(Duration::from_secs(1), tokio::time::sleep(Duration::from_millis(1500)));
    let finished = tokio::time::timeout(Duration::from_secs(600), run).await;

    assert!(finished.is_ok());
    assert!(orchestrator.fleet().agents().is_empty());
    assert!(orchestrator.is_shutting_down());
}
