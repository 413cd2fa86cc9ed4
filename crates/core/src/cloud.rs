// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cloud configuration: credentials, SSH identity, worker artifact and templates

use crate::TemplateConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Auth retry budget used when none is configured
pub const DEFAULT_AUTH_SLEEP_MS: u64 = 300_000;

/// A named cloud account and the templates provisioned in it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudConfig {
    pub name: String,
    /// Service-account key file (JSON)
    pub credentials_file: PathBuf,
    pub ssh: SshConfig,
    /// Total time bootstrap keeps retrying SSH authentication; 0 selects the default
    #[serde(default)]
    pub auth_sleep_ms: u64,
    #[serde(default = "default_compute_endpoint")]
    pub compute_endpoint: String,
    #[serde(default = "default_iam_endpoint")]
    pub iam_endpoint: String,
    /// Upper bound on instances requested by a single provisioning call
    #[serde(default = "default_max_per_request")]
    pub max_per_request: u32,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default, rename = "template")]
    pub templates: Vec<TemplateConfig>,
}

fn default_compute_endpoint() -> String {
    "https://compute.api.cloud.yandex.net".to_string()
}

fn default_iam_endpoint() -> String {
    "https://iam.api.cloud.yandex.net/iam/v1/tokens".to_string()
}

fn default_max_per_request() -> u32 {
    1
}

impl CloudConfig {
    pub fn auth_sleep(&self) -> Duration {
        match self.auth_sleep_ms {
            0 => Duration::from_millis(DEFAULT_AUTH_SLEEP_MS),
            ms => Duration::from_millis(ms),
        }
    }

    pub fn template(&self, name: &str) -> Option<&TemplateConfig> {
        self.templates.iter().find(|t| t.name == name)
    }
}

/// Identity used to log into worker instances
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshConfig {
    pub private_key_file: PathBuf,
    pub username: String,
}

/// What runs on the instance once it is reachable.
///
/// `launch_command` may reference `{tmp_dir}`, `{work_dir}` and `{artifact}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Local file uploaded to the instance's tmp dir before launch
    pub artifact_path: Option<PathBuf>,
    pub artifact_name: String,
    pub runtime_check: String,
    pub runtime_install: String,
    pub copy_check: String,
    pub copy_install: String,
    pub launch_command: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            artifact_path: None,
            artifact_name: "remoting.jar".to_string(),
            runtime_check: "java -fullversion".to_string(),
            runtime_install: "sudo apt update; sudo apt install default-jdk -y".to_string(),
            copy_check: "which scp".to_string(),
            copy_install: "sudo apt install openssh-server -y".to_string(),
            launch_command: "java -jar {tmp_dir}/{artifact} -workDir {work_dir}".to_string(),
        }
    }
}

impl WorkerConfig {
    pub fn launch_command_for(&self, tmp_dir: &str, work_dir: &str) -> String {
        self.launch_command
            .replace("{tmp_dir}", tmp_dir)
            .replace("{work_dir}", work_dir)
            .replace("{artifact}", &self.artifact_name)
    }
}

#[cfg(test)]
#[path = "cloud_tests.rs"]
mod tests;
