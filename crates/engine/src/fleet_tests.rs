// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::{setup, worker_instance};
use tender_core::InstanceStatus;

#[tokio::test]
async fn add_replaces_existing_binding_for_same_instance() {
    let ctx = setup();
    let first = ctx.cloud.bind_agent(ctx.template(), worker_instance("fhm1", InstanceStatus::Running));
    let second = ctx.cloud.bind_agent(ctx.template(), worker_instance("fhm1", InstanceStatus::Running));

    ctx.fleet.add(Arc::clone(&first));
    ctx.fleet.add(Arc::clone(&second));

    assert_eq!(ctx.fleet.len(), 1);
    let bound = ctx.fleet.get(&InstanceId::from("fhm1")).unwrap();
    assert!(Arc::ptr_eq(&bound, &second));
}

#[tokio::test]
async fn agents_keep_attach_order() {
    let ctx = setup();
    for id in ["fhm3", "fhm1", "fhm2"] {
        ctx.attach(worker_instance(id, InstanceStatus::Running));
    }

    let ids: Vec<String> = ctx.fleet.agents().iter().map(|a| a.id().to_string()).collect();
    assert_eq!(ids, vec!["fhm3", "fhm1", "fhm2"]);
}

#[tokio::test]
async fn remove_returns_the_agent_once() {
    let ctx = setup();
    ctx.attach(worker_instance("fhm1", InstanceStatus::Running));
    let id = InstanceId::from("fhm1");

    assert!(ctx.fleet.contains(&id));
    assert!(ctx.fleet.remove(&id).is_some());
    assert!(ctx.fleet.remove(&id).is_none());
    assert!(!ctx.fleet.contains(&id));
    assert!(ctx.fleet.is_empty());
}
