// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const RSA_3072: &str = include_str!("testdata/rsa3072.pem");
const ED25519_OPENSSH: &str = include_str!("testdata/ed25519.openssh");

const RSA_3072_FINGERPRINT: &str = "ssh-rsa AAAAB3NzaC1yc2EAAAADAQABAAABgQDbArzg2mV2zxyiP7YZKjKO/8C0tftE3llzvfCkRRHDLp+9pXNJARotI1zqJ8dmO/IzuaTPuDwlFsu9inQwebKhynVqS7Eotejsdkl+wYmngSb72zttkWTORsx7qUZkBtRYGnAnCCI+rnvRFXlFADvOkJSWzu+vc0x174u7RCuA8LoDGuLh8hFvrxJpsIs37A7TewHty1osb7xMTNTx9UHjxTxxJ94tWukAPUTFY5no3WZOzIK9nK31FVXx87qeN2JY/aIjwQMkgsmhKXpbWH440QjZ5+oLTXo9hXQvLPzjrCb60PkNlyJpwScXccK7FWQp6EHemPx/n2wAeaFju53o1RC/LnNW6ZZw0pXx2HYHimH/M8lEdTSEW5FhDXiClC0mFxNCTJu5I1Ci0SkeH2WMEDKs31uvXpuHS9ymyM/dekNwnbn03iNe1wx5VXzevIGvVe6llnlDm2R5iboyZtl+crtfVdMhws15YI3SWeIuBU8TAz47lND8CzTSJiSZcGc";

#[test]
fn rsa_fingerprint_matches_golden_value() {
    let key = PrivateKey::new(RSA_3072, "test").unwrap();
    assert_eq!(key.format(), KeyFormat::PemRsa);
    assert_eq!(key.fingerprint().unwrap(), RSA_3072_FINGERPRINT);
}

#[test]
fn authorized_key_is_padded_fingerprint() {
    let key = PrivateKey::new(RSA_3072, "test").unwrap();
    let authorized = key.authorized_key().unwrap();
    assert_eq!(authorized, format!("{}=", RSA_3072_FINGERPRINT));
}

#[test]
fn openssh_key_exposes_stored_public_blob() {
    let key = PrivateKey::new(ED25519_OPENSSH, "builder").unwrap();
    assert_eq!(key.format(), KeyFormat::OpenSsh);
    assert_eq!(
        key.authorized_key().unwrap(),
        "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIHGtoFpWsYhFJ0XgdnQzhC4NAGwjxZ0rIKJVTbK1IyXn"
    );
    assert!(key.validate().is_ok());
}

#[test]
fn missing_markers_are_rejected() {
    let err = PrivateKey::new("ssh-rsa AAAA", "test").unwrap_err();
    assert!(matches!(err, KeyError::Invalid(_)));
}

#[test]
fn garbage_between_markers_fails_validation() {
    let pem = format!("{}\nbm90IGEga2V5\n{}\n", RSA_BEGIN, RSA_END);
    let key = PrivateKey::new(pem, "test").unwrap();
    assert!(matches!(key.validate(), Err(KeyError::Invalid(_))));
}

#[test]
fn debug_does_not_leak_key_material() {
    let key = PrivateKey::new(RSA_3072, "test").unwrap();
    let debug = format!("{:?}", key);
    assert!(debug.contains("test"));
    assert!(!debug.contains("MIIG5A"));
}

#[test]
fn from_file_reports_missing_path() {
    let err = PrivateKey::from_file(Path::new("/nonexistent/id_rsa"), "test").unwrap_err();
    assert!(matches!(err, KeyError::Missing(_)));
}

#[tokio::test]
async fn file_provider_reads_key_on_resolve() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("id_rsa");
    let provider = FileKeyProvider::new(&path, "builder");
    assert!(provider.resolve().await.is_none());

    std::fs::write(&path, RSA_3072).unwrap();
    let key = provider.resolve().await.unwrap();
    assert_eq!(key.username(), "builder");
}

#[tokio::test]
async fn static_provider() {
    assert!(StaticKeyProvider::empty().resolve().await.is_none());
    let key = PrivateKey::new(RSA_3072, "test").unwrap();
    assert!(StaticKeyProvider::new(key).resolve().await.is_some());
}
