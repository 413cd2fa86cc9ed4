// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Adapters for external I/O: the compute API, its token exchange,
//! SSH keys and remote shells.

pub mod channel;
pub mod compute;
pub mod iam;
pub mod identity;
pub mod shell;
pub mod token;

pub use channel::WorkerChannel;
pub use compute::rest::{ApiChannel, RestComputeClient};
pub use compute::{ComputeError, ComputeService, CreateInstanceSpec, InstanceFilter, Operation};
pub use iam::{FileCredentialSource, IamTokenIssuer, ServiceAccountKey};
pub use identity::{FileKeyProvider, KeyError, KeyFormat, KeyProvider, PrivateKey, StaticKeyProvider};
pub use shell::{
    ExecOutput, OpenSshShell, ProcessStreams, RemoteShell, ShellError, ShellSession, SshTarget,
};
pub use token::{ChannelOpener, CredentialSource, Token, TokenCache, TokenIssuer};

#[cfg(any(test, feature = "test-support"))]
pub use compute::{ComputeCall, FakeComputeService};
#[cfg(any(test, feature = "test-support"))]
pub use shell::{FakeConnect, FakeRemoteShell};
