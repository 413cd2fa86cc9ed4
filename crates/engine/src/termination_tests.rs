// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::{setup, test_key, worker_instance};
use crate::FleetRegistry;
use std::time::Duration;
use tender_adapters::{ComputeError, RemoteShell, SshTarget, WorkerChannel};
use tender_core::InstanceStatus;

#[tokio::test(start_paused = true)]
async fn concurrent_requests_coalesce_into_one_termination() {
    let mut ctx = setup();
    let agent = ctx.attach_online("fhm1");
    ctx.compute.set_delete_delay(Duration::from_secs(5));

    let first = terminate(&agent);
    let second = terminate(&agent);
    let third = terminate(&agent);

    assert!(first.is_some());
    assert!(second.is_none());
    assert!(third.is_none());
    assert!(!agent.is_accepting_tasks());

    first.unwrap().await.unwrap();
    assert_eq!(ctx.compute.delete_count(), 1);
    assert!(agent.is_accepting_tasks());
    assert!(!ctx.fleet.contains(agent.id()));
    let events = ctx.drain_events().await;
    assert_eq!(events, vec![FleetEvent::AgentTerminated { instance_id: agent.id().clone() }]);
}

#[tokio::test]
async fn latch_rearms_after_completion() {
    let ctx = setup();
    let agent = ctx.attach_online("fhm1");

    terminate(&agent).unwrap().await.unwrap();
    let again = terminate(&agent).unwrap();
    again.await.unwrap();

    // Second pass sees the instance gone and skips the delete
    assert_eq!(ctx.compute.delete_count(), 1);
}

#[tokio::test]
async fn stopped_instance_is_removed_without_delete() {
    let ctx = setup();
    let agent = ctx.attach(worker_instance("fhm1", InstanceStatus::Stopped));

    terminate(&agent).unwrap().await.unwrap();

    assert_eq!(ctx.compute.delete_count(), 0);
    assert!(!ctx.fleet.contains(agent.id()));
}

#[tokio::test]
async fn failed_delete_keeps_the_agent_and_releases_the_latch() {
    let ctx = setup();
    let agent = ctx.attach_online("fhm1");
    // Fetch fails so the instance is assumed alive; the delete then fails
    ctx.compute.set_get_error(Some(ComputeError::Client("503: unavailable".into())));
    ctx.compute.remove(agent.id());

    terminate(&agent).unwrap().await.unwrap();

    assert_eq!(ctx.compute.delete_count(), 1);
    assert!(ctx.fleet.contains(agent.id()));
    assert!(agent.is_accepting_tasks());
    assert!(agent.is_connected());
}

#[tokio::test]
async fn termination_closes_the_worker_channel() {
    let ctx = setup();
    let agent = ctx.attach_online("fhm1");
    let session = ctx.shell.connect(&SshTarget::new("10.0.0.9"), &test_key()).await.unwrap();
    let streams = session.spawn("java -jar /tmp/remoting.jar").await.unwrap();
    agent.attach_channel(WorkerChannel::new(streams, session)).await;

    terminate(&agent).unwrap().await.unwrap();

    assert!(!agent.has_channel().await);
    assert_eq!(ctx.shell.closed_sessions(), 1);
    assert_eq!(agent.offline_cause().as_deref(), Some("terminated"));
}

#[tokio::test]
async fn stop_keeps_the_agent_registered() {
    let mut ctx = setup();
    let agent = ctx.attach_online("fhm1");

    stop(&agent).await;

    assert_eq!(ctx.compute.instance(agent.id()).unwrap().status, InstanceStatus::Stopped);
    assert!(ctx.fleet.contains(agent.id()));
    assert!(!agent.is_connected());
    let events = ctx.drain_events().await;
    assert_eq!(events, vec![FleetEvent::AgentStopped { instance_id: agent.id().clone() }]);
}

#[tokio::test]
async fn failed_stop_leaves_the_agent_online() {
    let ctx = setup();
    let agent = ctx.attach_online("fhm1");
    ctx.compute.remove(agent.id());

    stop(&agent).await;

    assert!(agent.is_connected());
}
