// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    blank = { "", IdleTermination::Disabled },
    whitespace = { "   ", IdleTermination::Disabled },
    zero = { "0", IdleTermination::Disabled },
    positive = { "15", IdleTermination::AfterMinutes(15) },
    padded = { " 45 ", IdleTermination::AfterMinutes(45) },
    negative = { "-5", IdleTermination::BillingPeriod(5) },
    malformed = { "soon", IdleTermination::AfterMinutes(30) },
    fractional = { "1.5", IdleTermination::AfterMinutes(30) },
)]
fn idle_termination_parses(raw: &str, expected: IdleTermination) {
    assert_eq!(IdleTermination::parse(raw), expected);
}

#[test]
fn idle_termination_minutes_round_trip_sign() {
    assert_eq!(IdleTermination::BillingPeriod(5).minutes(), -5);
    assert_eq!(IdleTermination::AfterMinutes(10).minutes(), 10);
    assert_eq!(IdleTermination::Disabled.minutes(), 0);
}

#[test]
fn template_deserializes_with_defaults() {
    let template: TemplateConfig = toml::from_str(
        r#"
        name = "small"
        vm_name = "ci-small"
        idle_termination_minutes = "-10"
        "#,
    )
    .unwrap();

    assert_eq!(template.num_executors, 1);
    assert_eq!(template.idle_termination, IdleTermination::BillingPeriod(10));
    assert_eq!(template.remote_fs, "/tmp/worker");
    assert_eq!(template.tmp_dir, "/tmp");
    assert_eq!(template.mode, TemplateMode::Normal);
    assert!(template.connect_on_start);
    assert!(template.spec.is_object());
    assert!(template.launch_timeout().is_none());
}

#[test]
fn template_accepts_integer_idle_minutes_and_inline_spec() {
    let template: TemplateConfig = toml::from_str(
        r#"
        name = "big"
        vm_name = "ci-big"
        idle_termination_minutes = 20
        launch_timeout_secs = 600
        mode = "exclusive"
        spec = { zoneId = "zone-a", resourcesSpec = { memory = 4294967296, cores = 2 } }
        "#,
    )
    .unwrap();

    assert_eq!(template.idle_termination, IdleTermination::AfterMinutes(20));
    assert_eq!(template.launch_timeout(), Some(Duration::from_secs(600)));
    assert_eq!(template.mode, TemplateMode::Exclusive);
    assert_eq!(template.spec["resourcesSpec"]["cores"], 2);
}

#[parameterized(
    normal_unlabelled = { TemplateMode::Normal, None, true },
    normal_matching = { TemplateMode::Normal, Some("linux"), true },
    normal_other = { TemplateMode::Normal, Some("windows"), false },
    exclusive_unlabelled = { TemplateMode::Exclusive, None, false },
    exclusive_matching = { TemplateMode::Exclusive, Some("linux"), true },
)]
fn label_matching(mode: TemplateMode, label: Option<&str>, expected: bool) {
    let template = TemplateConfig::builder().mode(mode).build();
    assert_eq!(template.matches_label(label), expected);
}

#[parameterized(
    single_letter = { "a", true },
    typical = { "ci-worker-1", true },
    trailing_dash = { "ci-", false },
    leading_digit = { "1ci", false },
    uppercase = { "Ci", false },
    underscore = { "ci_worker", false },
    empty = { "", false },
)]
fn vm_name_rules(name: &str, valid: bool) {
    assert_eq!(is_valid_vm_name(name), valid);
}

#[test]
fn vm_name_length_limit() {
    assert!(is_valid_vm_name(&format!("a{}", "b".repeat(62))));
    assert!(!is_valid_vm_name(&format!("a{}", "b".repeat(63))));
}

#[test]
fn validate_reports_bad_fields() {
    let bad_name = TemplateConfig::builder().vm_name("Bad").build();
    assert!(matches!(bad_name.validate(), Err(TemplateError::InvalidVmName { .. })));

    let no_exec = TemplateConfig::builder().num_executors(0).build();
    assert_eq!(no_exec.validate(), Err(TemplateError::NoExecutors("linux-small".to_string())));

    let bad_spec = TemplateConfig::builder().spec(serde_json::json!([1, 2])).build();
    assert!(matches!(bad_spec.validate(), Err(TemplateError::SpecNotObject(_))));

    assert!(TemplateConfig::builder().build().validate().is_ok());
}

#[test]
fn work_dir_falls_back_to_tmp() {
    let template = TemplateConfig::builder().remote_fs("").tmp_dir("/var/tmp").build();
    assert_eq!(template.work_dir(), "/var/tmp");
}

#[test]
fn blank_init_script_is_ignored() {
    let template = TemplateConfig::builder().init_script("   ").build();
    assert_eq!(template.init_script(), None);
    let template = TemplateConfig::builder().init_script("apt install -y git").build();
    assert_eq!(template.init_script(), Some("apt install -y git"));
}
