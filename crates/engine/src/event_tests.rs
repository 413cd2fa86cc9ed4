// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn id() -> InstanceId {
    InstanceId::from("fhm1")
}

#[parameterized(
    attached = {
        FleetEvent::AgentAttached { instance_id: id(), template: "linux-small".into() },
        "agent:attached instance=fhm1 template=linux-small"
    },
    connected = { FleetEvent::AgentConnected { instance_id: id() }, "agent:connected instance=fhm1" },
    launch_failed = {
        FleetEvent::LaunchFailed { instance_id: id(), error: "timed out".into() },
        "agent:launch_failed instance=fhm1 error=timed out"
    },
    provision_failed = {
        FleetEvent::ProvisionFailed {
            cloud: "yc".into(),
            template: "linux-small".into(),
            label: None,
            error: "quota".into(),
        },
        "provision:failed cloud=yc template=linux-small label=- error=quota"
    },
    terminated = { FleetEvent::AgentTerminated { instance_id: id() }, "agent:terminated instance=fhm1" },
    stopped = { FleetEvent::AgentStopped { instance_id: id() }, "agent:stopped instance=fhm1" },
)]
fn log_summary(event: FleetEvent, expected: &str) {
    assert_eq!(event.log_summary(), expected);
}

#[test]
fn provision_failure_has_no_instance() {
    let event = FleetEvent::ProvisionFailed {
        cloud: "yc".into(),
        template: "t".into(),
        label: Some("linux".into()),
        error: "e".into(),
    };
    assert!(event.instance_id().is_none());
    assert_eq!(FleetEvent::AgentStopped { instance_id: id() }.instance_id(), Some(&id()));
}
