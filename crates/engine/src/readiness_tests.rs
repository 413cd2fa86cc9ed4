// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::{setup_with, worker_instance, TestContext};
use crate::{EngineConfig, FleetRegistry, ReadinessConfig};
use std::time::Duration;
use tender_adapters::ComputeError;
use tender_core::TemplateConfig;
use yare::parameterized;

fn context(connect_on_start: bool, stuck_limit: u32) -> TestContext {
    setup_with(
        vec![TemplateConfig::builder().connect_on_start(connect_on_start).build()],
        EngineConfig::default().readiness(ReadinessConfig::default().stuck_limit(stuck_limit)),
    )
}

fn planned(ctx: &TestContext, status: InstanceStatus) -> Arc<Agent<tender_core::FakeClock>> {
    let instance = worker_instance("fhm1", status);
    ctx.compute.insert(instance.clone());
    let agent = ctx.cloud.bind_agent(ctx.template(), instance);
    ctx.cloud.mark_pending(agent.id());
    agent
}

#[parameterized(
    provisioning = { Observation::Status(&InstanceStatus::Provisioning), ReadinessState::Polling, 0 },
    running = { Observation::Status(&InstanceStatus::Running), ReadinessState::Running, 0 },
    starting = { Observation::Status(&InstanceStatus::Starting), ReadinessState::Polling, 1 },
    unknown = { Observation::Unknown, ReadinessState::Polling, 1 },
    gone = { Observation::Gone, ReadinessState::Failed, 0 },
)]
fn single_observation(observation: Observation<'_>, expected: ReadinessState, stuck_after: u32) {
    let mut stuck = 0;
    assert_eq!(observe(observation, &mut stuck, 5), expected);
    assert_eq!(stuck, stuck_after);
}

#[test]
fn stuck_limit_is_inclusive() {
    let mut stuck = 0;
    for _ in 0..3 {
        assert_eq!(observe(Observation::Unknown, &mut stuck, 3), ReadinessState::Polling);
    }
    assert_eq!(observe(Observation::Unknown, &mut stuck, 3), ReadinessState::Failed);
}

#[tokio::test(start_paused = true)]
async fn running_instance_joins_the_fleet() {
    let mut ctx = context(false, 5);
    let agent = planned(&ctx, InstanceStatus::Provisioning);
    ctx.compute.script_statuses(
        agent.id(),
        vec![InstanceStatus::Provisioning, InstanceStatus::Provisioning, InstanceStatus::Running],
    );

    let started = tokio::time::Instant::now();
    let attached = await_running(Arc::clone(&agent)).await.unwrap();

    assert!(Arc::ptr_eq(&attached, &agent));
    assert_eq!(started.elapsed(), Duration::from_secs(20));
    assert!(ctx.fleet.contains(agent.id()));
    assert!(!ctx.cloud.is_pending(agent.id()));
    let events = ctx.drain_events().await;
    assert_eq!(
        events,
        vec![FleetEvent::AgentAttached {
            instance_id: agent.id().clone(),
            template: "linux-small".into(),
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn provisioning_never_counts_as_stuck() {
    let ctx = context(false, 1);
    let agent = planned(&ctx, InstanceStatus::Provisioning);
    let mut script = vec![InstanceStatus::Provisioning; 12];
    script.push(InstanceStatus::Running);
    ctx.compute.script_statuses(agent.id(), script);

    assert!(await_running(agent).await.is_some());
}

#[tokio::test(start_paused = true)]
async fn unexpected_status_fails_past_the_stuck_limit() {
    let ctx = context(false, 5);
    let agent = planned(&ctx, InstanceStatus::Stopping);

    let started = tokio::time::Instant::now();
    assert!(await_running(Arc::clone(&agent)).await.is_none());

    // Five tolerated observations, each followed by one poll interval
    assert_eq!(started.elapsed(), Duration::from_secs(50));
    assert!(!ctx.fleet.contains(agent.id()));
    assert!(!ctx.cloud.is_pending(agent.id()));
}

#[tokio::test(start_paused = true)]
async fn api_errors_count_toward_the_stuck_limit() {
    let ctx = context(false, 2);
    let agent = planned(&ctx, InstanceStatus::Provisioning);
    ctx.compute.set_get_error(Some(ComputeError::Client("503: unavailable".into())));

    assert!(await_running(agent).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn vanished_instance_fails_immediately() {
    let ctx = context(false, 5);
    let agent = planned(&ctx, InstanceStatus::Provisioning);
    ctx.compute.remove(agent.id());

    let started = tokio::time::Instant::now();
    assert!(await_running(agent).await.is_none());
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn connect_on_start_launches_the_worker() {
    let mut ctx = context(true, 5);
    let agent = planned(&ctx, InstanceStatus::Running);

    await_running(Arc::clone(&agent)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert!(agent.is_connected());
    assert!(agent.has_channel().await);
    let events = ctx.drain_events().await;
    assert_eq!(events.last(), Some(&FleetEvent::AgentConnected { instance_id: agent.id().clone() }));
}

#[tokio::test(start_paused = true)]
async fn no_launch_while_shutting_down() {
    let ctx = context(true, 5);
    let agent = planned(&ctx, InstanceStatus::Running);
    ctx.cloud.begin_shutdown();

    await_running(Arc::clone(&agent)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert!(!agent.is_connected());
    assert_eq!(ctx.shell.connect_attempts(), 0);
}
