// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retention policy: decides when an idle or stuck agent is reclaimed.
//!
//! [`check`] is called roughly once a minute per agent. It is rate limited
//! through `next_check_after_ms` and never runs concurrently with itself for
//! the same agent; a caller that loses the `try_lock` race just gets `1` back.

use crate::agent::Agent;
use crate::termination;
use std::sync::Arc;
use tender_core::{Clock, IdleTermination, InstanceStatus};

const MINUTE_MS: u64 = 60_000;
const BILLING_PERIOD_SECS: u64 = 3_600;

/// Per-agent rate-limit state
#[derive(Debug, Default)]
pub(crate) struct RetentionState {
    next_check_after_ms: Option<u64>,
}

/// Whether a newly registered agent should be connected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartDecision {
    Connect,
    Skip,
}

/// Run the retention policy for `agent`.
///
/// Returns the number of minutes until the next check is worthwhile.
pub async fn check<C: Clock>(agent: &Arc<Agent<C>>) -> u64 {
    let Ok(mut state) = agent.retention.try_lock() else {
        return 1;
    };
    let now = agent.cloud().now_ms();
    if state.next_check_after_ms.is_some_and(|next| now <= next) {
        return 1;
    }
    let interval = evaluate(agent, now).await;
    state.next_check_after_ms = Some(now + interval * MINUTE_MS);
    interval
}

async fn evaluate<C: Clock>(agent: &Arc<Agent<C>>, now: u64) -> u64 {
    let template = agent.template();
    let cloud = agent.cloud();
    if template.idle_termination.is_disabled() || !cloud.fleet().contains(agent.id()) {
        return 1;
    }
    if !agent.is_idle() || cloud.engine().retention_disabled {
        return 1;
    }

    let instance = match agent.instance(true).await {
        Ok(Some(instance)) => instance,
        Ok(None) => {
            tracing::info!(instance_id = %agent.id(), "instance terminated externally");
            termination::terminate(agent);
            return 1;
        }
        Err(e) => {
            tracing::debug!(
                instance_id = %agent.id(),
                error = %e,
                "failed to fetch instance, will retry next check"
            );
            return 1;
        }
    };
    let uptime_ms = instance.uptime_ms(now);

    if agent.is_connecting() {
        if let Some(timeout) = template.launch_timeout() {
            let timeout_ms = timeout.as_secs() * 1_000;
            if uptime_ms > timeout_ms {
                tracing::info!(
                    instance_id = %agent.id(),
                    uptime_ms,
                    timeout_ms,
                    status = %instance.status,
                    "startup timeout expired"
                );
                launch_timeout(agent);
            }
        }
        return 1;
    }

    // Already reclaimed by a stop; nothing left to save
    if instance.status == InstanceStatus::Stopped {
        return 1;
    }

    let idle_ms = agent.idle_ms(now);
    match template.idle_termination {
        IdleTermination::Disabled => {}
        IdleTermination::AfterMinutes(minutes) => {
            if idle_ms > minutes * MINUTE_MS {
                tracing::info!(
                    instance_id = %agent.id(),
                    idle_minutes = idle_ms / MINUTE_MS,
                    status = %instance.status,
                    "idle timeout"
                );
                idle_timeout(agent).await;
            }
        }
        IdleTermination::BillingPeriod(minutes) => {
            if billing_period_expiring(uptime_ms, minutes) {
                tracing::info!(
                    instance_id = %agent.id(),
                    idle_minutes = idle_ms / MINUTE_MS,
                    free_minutes = free_billing_secs(uptime_ms) / 60,
                    "idle timeout with billing period ending"
                );
                idle_timeout(agent).await;
            }
        }
    }
    1
}

/// Seconds left in the current billing hour
pub fn free_billing_secs(uptime_ms: u64) -> u64 {
    BILLING_PERIOD_SECS - (uptime_ms / 1_000) % BILLING_PERIOD_SECS
}

/// Whether at most `minutes` remain before the instance starts another billed hour.
pub fn billing_period_expiring(uptime_ms: u64, minutes: u64) -> bool {
    free_billing_secs(uptime_ms) <= minutes * 60
}

/// Reclaim an agent that sat idle too long.
pub async fn idle_timeout<C: Clock>(agent: &Arc<Agent<C>>) {
    tracing::info!(instance_id = %agent.id(), "instance idle time expired");
    if agent.template().stop_on_terminate {
        termination::stop(agent).await;
    } else {
        termination::terminate(agent);
    }
}

/// Destroy an agent that never came up, regardless of `stop_on_terminate`.
pub fn launch_timeout<C: Clock>(agent: &Arc<Agent<C>>) {
    tracing::info!(instance_id = %agent.id(), "instance failed to launch");
    termination::terminate(agent);
}

/// Decide whether a newly registered agent should be connected.
///
/// While the host is still starting up only instances that are already
/// running get connected, so a restart does not wake the whole fleet.
pub async fn start<C: Clock>(agent: &Arc<Agent<C>>, host_starting: bool) -> StartDecision {
    if !host_starting {
        tracing::info!(instance_id = %agent.id(), "start requested");
        return StartDecision::Connect;
    }
    let status = match agent.instance(true).await {
        Ok(instance) => instance.map(|i| i.status),
        Err(e) => {
            tracing::info!(instance_id = %agent.id(), error = %e, "failed to get instance state");
            None
        }
    };
    if status == Some(InstanceStatus::Running) {
        tracing::info!(instance_id = %agent.id(), "start requested");
        StartDecision::Connect
    } else {
        tracing::info!(
            instance_id = %agent.id(),
            status = ?status,
            "ignoring start request during host startup"
        );
        StartDecision::Skip
    }
}

/// Post-task hook: terminate once the last running task of a draining agent finishes.
pub fn task_completed<C: Clock>(agent: &Arc<Agent<C>>) {
    if agent.busy() <= 1 && !agent.is_accepting_tasks() {
        tracing::info!(instance_id = %agent.id(), "terminating drained agent");
        termination::terminate(agent);
    }
    agent.task_finished();
}

#[cfg(test)]
#[path = "retention_tests.rs"]
mod tests;
