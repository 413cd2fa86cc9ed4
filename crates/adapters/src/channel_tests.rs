// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::identity::PrivateKey;
use crate::shell::{FakeRemoteShell, RemoteShell, SshTarget};
use tokio::io::AsyncWriteExt;

fn key() -> PrivateKey {
    PrivateKey::new(include_str!("identity/testdata/rsa3072.pem"), "builder").unwrap()
}

#[tokio::test]
async fn close_releases_session() {
    let shell = FakeRemoteShell::new();
    let session = shell.connect(&SshTarget::new("10.0.0.5"), &key()).await.unwrap();
    let streams = session.spawn("java -jar /tmp/remoting.jar").await.unwrap();
    let mut channel = WorkerChannel::new(streams, session);

    channel.writer().write_all(b"hello").await.unwrap();
    assert_eq!(shell.spawned("10.0.0.5"), vec!["java -jar /tmp/remoting.jar"]);

    channel.close().await;
    assert_eq!(shell.closed_sessions(), 1);
}
