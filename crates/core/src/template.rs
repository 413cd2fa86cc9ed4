// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Templates: immutable configuration for a class of worker instances

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::Duration;
use thiserror::Error;

/// Idle minutes applied when the configured value cannot be parsed
pub const FALLBACK_IDLE_MINUTES: u64 = 30;

/// Errors from template validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template {template}: invalid vm name {vm_name:?}; expected [a-z]([-a-z0-9]{{0,61}}[a-z0-9])?")]
    InvalidVmName { template: String, vm_name: String },
    #[error("template {0}: num_executors must be at least 1")]
    NoExecutors(String),
    #[error("template {0}: spec must be a JSON object")]
    SpecNotObject(String),
}

/// When an idle agent is reclaimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdleTermination {
    /// Never reclaim for idleness
    #[default]
    Disabled,
    /// Reclaim once idle for more than this many minutes
    AfterMinutes(u64),
    /// Reclaim when at most this many minutes remain in the current
    /// hourly billing period
    BillingPeriod(u64),
}

impl IdleTermination {
    /// Parse the configured minute count.
    ///
    /// Blank or zero disables, negative selects billing-period mode, and
    /// anything unparseable falls back to [`FALLBACK_IDLE_MINUTES`].
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return Self::Disabled;
        }
        match raw.parse::<i64>() {
            Ok(n) => Self::from_minutes(n),
            Err(_) => Self::AfterMinutes(FALLBACK_IDLE_MINUTES),
        }
    }

    pub fn from_minutes(n: i64) -> Self {
        match n {
            0 => Self::Disabled,
            n if n > 0 => Self::AfterMinutes(n as u64),
            n => Self::BillingPeriod(n.unsigned_abs()),
        }
    }

    /// Signed minute count as written in configuration
    pub fn minutes(&self) -> i64 {
        match self {
            Self::Disabled => 0,
            Self::AfterMinutes(n) => *n as i64,
            Self::BillingPeriod(n) => -(*n as i64),
        }
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled)
    }
}

impl Serialize for IdleTermination {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.minutes())
    }
}

impl<'de> Deserialize<'de> for IdleTermination {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Minutes(i64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Minutes(n) => Self::from_minutes(n),
            Raw::Text(s) => Self::parse(&s),
        })
    }
}

/// How a template participates in label matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateMode {
    /// Serve any work, labelled or not
    #[default]
    Normal,
    /// Serve only work that names one of the template's labels
    Exclusive,
}

crate::simple_display! {
    TemplateMode {
        Normal => "normal",
        Exclusive => "exclusive",
    }
}

/// Configuration for one class of worker instances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateConfig {
    /// Human-readable description
    pub name: String,
    /// Instance name; also the list filter used for orphan detection
    pub vm_name: String,
    #[serde(default)]
    pub folder_id: String,
    /// Opaque create-instance body; identity metadata is merged in at create time
    #[serde(default = "empty_spec")]
    pub spec: serde_json::Value,
    #[serde(default = "default_num_executors")]
    pub num_executors: u32,
    #[serde(default, rename = "idle_termination_minutes")]
    pub idle_termination: IdleTermination,
    /// Stop the instance on idle instead of deleting it
    #[serde(default)]
    pub stop_on_terminate: bool,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub mode: TemplateMode,
    #[serde(default = "default_remote_fs")]
    pub remote_fs: String,
    #[serde(default = "default_tmp_dir")]
    pub tmp_dir: String,
    #[serde(default)]
    pub init_script: Option<String>,
    /// Seconds allowed between creation and a live worker channel (0 = unbounded)
    #[serde(default)]
    pub launch_timeout_secs: u64,
    #[serde(default = "default_true")]
    pub connect_on_start: bool,
}

fn empty_spec() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

fn default_num_executors() -> u32 {
    1
}

fn default_remote_fs() -> String {
    "/tmp/worker".to_string()
}

fn default_tmp_dir() -> String {
    "/tmp".to_string()
}

fn default_true() -> bool {
    true
}

impl TemplateConfig {
    /// Whether this template may serve work carrying `label`.
    pub fn matches_label(&self, label: Option<&str>) -> bool {
        match (label, self.mode) {
            (None, TemplateMode::Normal) => true,
            (None, TemplateMode::Exclusive) => false,
            (Some(label), _) => self.labels.iter().any(|l| l == label),
        }
    }

    pub fn launch_timeout(&self) -> Option<Duration> {
        (self.launch_timeout_secs > 0).then(|| Duration::from_secs(self.launch_timeout_secs))
    }

    /// Directory the worker process runs in
    pub fn work_dir(&self) -> &str {
        if self.remote_fs.trim().is_empty() {
            &self.tmp_dir
        } else {
            &self.remote_fs
        }
    }

    /// Init script, if one is configured and not blank
    pub fn init_script(&self) -> Option<&str> {
        self.init_script.as_deref().filter(|s| !s.trim().is_empty())
    }

    pub fn validate(&self) -> Result<(), TemplateError> {
        if !is_valid_vm_name(&self.vm_name) {
            return Err(TemplateError::InvalidVmName {
                template: self.name.clone(),
                vm_name: self.vm_name.clone(),
            });
        }
        if self.num_executors == 0 {
            return Err(TemplateError::NoExecutors(self.name.clone()));
        }
        if !self.spec.is_object() {
            return Err(TemplateError::SpecNotObject(self.name.clone()));
        }
        Ok(())
    }
}

/// Check `[a-z]([-a-z0-9]{0,61}[a-z0-9])?`
pub fn is_valid_vm_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    let Some((&first, rest)) = bytes.split_first() else {
        return false;
    };
    if !first.is_ascii_lowercase() || bytes.len() > 63 {
        return false;
    }
    let Some(&last) = rest.last() else {
        return true;
    };
    let inner_ok = rest.iter().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-');
    inner_ok && last != b'-'
}

crate::builder! {
    pub struct TemplateConfigBuilder => TemplateConfig {
        into {
            name: String = "linux-small",
            vm_name: String = "ci-worker",
            folder_id: String = "folder-1",
            remote_fs: String = "/tmp/worker",
            tmp_dir: String = "/tmp",
        }
        set {
            spec: serde_json::Value = serde_json::json!({ "zoneId": "zone-a" }),
            num_executors: u32 = 1,
            idle_termination: IdleTermination = IdleTermination::AfterMinutes(30),
            stop_on_terminate: bool = false,
            labels: Vec<String> = vec!["linux".to_string()],
            mode: TemplateMode = TemplateMode::Normal,
            launch_timeout_secs: u64 = 0,
            connect_on_start: bool = true,
        }
        option {
            init_script: String = None,
        }
    }
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
