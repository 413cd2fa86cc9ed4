// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;
use tender_core::{IdleTermination, TemplateMode};

const SAMPLE: &str = r#"
[[cloud]]
name = "ycloud"
credentials_file = "/etc/tender/sa.json"
max_per_request = 2

[cloud.ssh]
private_key_file = "/etc/tender/id_rsa"
username = "builder"

[cloud.worker]
artifact_path = "/opt/tender/remoting.jar"

[[cloud.template]]
name = "linux-small"
vm_name = "ci-small"
folder_id = "b1g-folder"
labels = ["linux", "small"]
idle_termination_minutes = -5
init_script = "apt-get install -y git"

[cloud.template.spec]
platformId = "standard-v3"

[[cloud.template]]
name = "gpu"
vm_name = "ci-gpu"
mode = "exclusive"
num_executors = 2
idle_termination_minutes = "15"
"#;

#[test]
fn parses_clouds_and_templates() {
    let config = TenderConfig::parse(SAMPLE).unwrap();

    assert_eq!(config.clouds.len(), 1);
    let cloud = &config.clouds[0];
    assert_eq!(cloud.name, "ycloud");
    assert_eq!(cloud.max_per_request, 2);
    assert_eq!(cloud.ssh.username, "builder");
    assert_eq!(cloud.worker.artifact_name, "remoting.jar");
    assert_eq!(cloud.compute_endpoint, "https://compute.api.cloud.yandex.net");

    let small = cloud.template("linux-small").unwrap();
    assert_eq!(small.idle_termination, IdleTermination::BillingPeriod(5));
    assert_eq!(small.spec["platformId"], "standard-v3");
    assert!(small.connect_on_start);
    assert_eq!(small.work_dir(), "/tmp/worker");

    let gpu = cloud.template("gpu").unwrap();
    assert_eq!(gpu.mode, TemplateMode::Exclusive);
    assert_eq!(gpu.idle_termination, IdleTermination::AfterMinutes(15));
    assert_eq!(gpu.num_executors, 2);
}

#[test]
fn rejects_empty_config() {
    assert!(matches!(TenderConfig::parse(""), Err(ConfigError::NoClouds)));
}

#[test]
fn rejects_duplicate_cloud_names() {
    let cloud = r#"
[[cloud]]
name = "ycloud"
credentials_file = "/sa.json"
ssh = { private_key_file = "/id_rsa", username = "builder" }
"#;
    let text = format!("{cloud}{cloud}");

    let err = TenderConfig::parse(&text).unwrap_err();

    assert!(matches!(err, ConfigError::DuplicateCloud(name) if name == "ycloud"));
}

#[test]
fn rejects_blank_cloud_name() {
    let text = r#"
[[cloud]]
name = " "
credentials_file = "/sa.json"
ssh = { private_key_file = "/id_rsa", username = "builder" }
"#;
    assert!(matches!(TenderConfig::parse(text), Err(ConfigError::UnnamedCloud)));
}

#[test]
fn template_errors_name_the_cloud() {
    let text = r#"
[[cloud]]
name = "ycloud"
credentials_file = "/sa.json"
ssh = { private_key_file = "/id_rsa", username = "builder" }

[[cloud.template]]
name = "bad"
vm_name = "CI_Worker"
"#;

    let err = TenderConfig::parse(text).unwrap_err();

    assert!(matches!(err, ConfigError::Template { ref cloud, .. } if cloud == "ycloud"));
    assert!(err.to_string().contains("invalid vm name \"CI_Worker\""));
}

#[test]
fn malformed_toml_is_a_parse_error() {
    assert!(matches!(TenderConfig::parse("[[cloud]\n"), Err(ConfigError::Parse(_))));
}

#[test]
fn load_reports_the_missing_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    let err = load(&path).unwrap_err();

    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn load_reads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tender.toml");
    std::fs::write(&path, SAMPLE).unwrap();

    assert_eq!(load(&path).unwrap().clouds[0].templates.len(), 2);
}

#[test]
#[serial]
fn cli_path_wins_over_env() {
    std::env::set_var("TENDER_CONFIG", "/from/env.toml");

    assert_eq!(resolve_path(Some(Path::new("/cli.toml"))).unwrap(), PathBuf::from("/cli.toml"));
    assert_eq!(resolve_path(None).unwrap(), PathBuf::from("/from/env.toml"));
    std::env::remove_var("TENDER_CONFIG");
}
