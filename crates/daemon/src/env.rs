// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

use tender_engine::EngineConfig;

use crate::lifecycle::LifecycleError;

/// Resolve state directory: TENDER_STATE_DIR > XDG state dir/tender > ~/.local/state/tender
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("TENDER_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Some(dir) = dirs::state_dir() {
        return Ok(dir.join("tender"));
    }
    let home = dirs::home_dir().ok_or(LifecycleError::NoStateDir)?;
    Ok(home.join(".local/state/tender"))
}

/// Config file named by `TENDER_CONFIG`
pub fn config_path() -> Option<PathBuf> {
    std::env::var("TENDER_CONFIG").ok().filter(|s| !s.is_empty()).map(PathBuf::from)
}

/// Log filter directives (default `info`)
pub fn log_filter() -> String {
    std::env::var("TENDER_LOG").ok().filter(|s| !s.is_empty()).unwrap_or_else(|| "info".into())
}

/// Retention tick interval (default 60s, configurable via `TENDER_TICK_MS`).
pub fn tick_interval() -> Duration {
    duration_ms("TENDER_TICK_MS").unwrap_or(Duration::from_secs(60))
}

/// Readiness poll interval override
pub fn ready_poll() -> Option<Duration> {
    duration_ms("TENDER_READY_POLL_MS")
}

/// Readiness stuck-limit override
pub fn ready_stuck_limit() -> Option<u32> {
    std::env::var("TENDER_READY_STUCK_LIMIT").ok().and_then(|s| s.parse::<u32>().ok())
}

/// Concurrent bootstrap limit override
pub fn max_launches() -> Option<usize> {
    std::env::var("TENDER_MAX_LAUNCHES")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|n| *n > 0)
}

/// Disable idle reclamation when set to `1` or `true`
pub fn retention_disabled() -> bool {
    std::env::var("TENDER_DISABLE_RETENTION")
        .map(|s| matches!(s.trim(), "1" | "true"))
        .unwrap_or(false)
}

/// Engine tuning with env overrides applied over the defaults
pub fn engine_config() -> EngineConfig {
    let defaults = EngineConfig::default();
    let mut readiness = defaults.readiness;
    if let Some(poll) = ready_poll() {
        readiness = readiness.poll_interval(poll);
    }
    if let Some(limit) = ready_stuck_limit() {
        readiness = readiness.stuck_limit(limit);
    }
    let max_launches = max_launches().unwrap_or(defaults.max_concurrent_launches);
    defaults
        .readiness(readiness)
        .max_concurrent_launches(max_launches)
        .retention_disabled(retention_disabled())
}

fn duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var).ok().and_then(|s| s.parse::<u64>().ok()).map(Duration::from_millis)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
