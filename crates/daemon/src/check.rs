// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tenderd check`: verify each cloud's SSH key and credentials.

use std::io::Write;

use tender_adapters::{
    ComputeError, CredentialSource, FileCredentialSource, IamTokenIssuer, KeyError, KeyFormat,
    PrivateKey, TokenIssuer,
};
use tender_core::{Clock, CloudConfig, SystemClock};
use thiserror::Error;

use crate::config::TenderConfig;

#[derive(Debug, Error)]
pub enum CheckError {
    #[error("cloud {cloud}: {source}")]
    Key {
        cloud: String,
        #[source]
        source: KeyError,
    },
    #[error("cloud {cloud}: {source}")]
    Token {
        cloud: String,
        #[source]
        source: ComputeError,
    },
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),
}

/// Check every cloud in order, stopping at the first failure.
pub async fn check(
    config: &TenderConfig,
    offline: bool,
    out: &mut impl Write,
) -> Result<(), CheckError> {
    for cloud in &config.clouds {
        writeln!(out, "cloud {}: {} template(s)", cloud.name, cloud.templates.len())?;
        check_key(cloud, out)?;
        if offline {
            writeln!(out, "  token: skipped (offline)")?;
        } else {
            check_token(cloud, out).await?;
        }
    }
    writeln!(out, "ok")?;
    Ok(())
}

fn check_key(cloud: &CloudConfig, out: &mut impl Write) -> Result<(), CheckError> {
    let path = &cloud.ssh.private_key_file;
    let (format, fingerprint) = PrivateKey::from_file(path, &cloud.ssh.username)
        .and_then(|key| {
            key.validate()?;
            Ok((key.format(), key.fingerprint()?))
        })
        .map_err(|source| CheckError::Key { cloud: cloud.name.clone(), source })?;

    let format = match format {
        KeyFormat::PemRsa => "pem-rsa",
        KeyFormat::OpenSsh => "openssh",
    };
    writeln!(out, "  ssh key {} ({}, user {:?})", path.display(), format, cloud.ssh.username)?;
    writeln!(out, "  fingerprint: {}", fingerprint)?;
    Ok(())
}

async fn check_token(cloud: &CloudConfig, out: &mut impl Write) -> Result<(), CheckError> {
    let token_error = |source| CheckError::Token { cloud: cloud.name.clone(), source };

    let key = FileCredentialSource::new(&cloud.credentials_file).load().await.map_err(token_error)?;
    let token = IamTokenIssuer::new(&cloud.iam_endpoint, SystemClock)
        .issue(&key)
        .await
        .map_err(token_error)?;

    let remaining_secs = token.expires_at_ms.saturating_sub(SystemClock.epoch_ms()) / 1000;
    tracing::debug!(
        cloud = %cloud.name,
        service_account = %key.service_account_id,
        "test token issued"
    );
    writeln!(out, "  token: ok for {} (expires in {}s)", key.service_account_id, remaining_secs)?;
    Ok(())
}

#[cfg(test)]
#[path = "check_tests.rs"]
mod tests;
