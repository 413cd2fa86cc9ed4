// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service-account credentials and IAM token exchange.
//!
//! ```text
//! key file (JSON) ──► JWT (PS256, kid = key id) ──► POST iam endpoint ──► { iamToken, expiresAt }
//! ```

use crate::token::{CredentialSource, Token, TokenIssuer};
use crate::ComputeError;
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tender_core::{Clock, SystemClock};

/// Lifetime requested for the signed JWT
const JWT_TTL: Duration = Duration::from_secs(3600);

/// Authorized key of a service account, as downloaded from the console
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub id: String,
    pub service_account_id: String,
    pub private_key: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub key_algorithm: Option<String>,
    #[serde(default)]
    pub public_key: Option<String>,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("id", &self.id)
            .field("service_account_id", &self.service_account_id)
            .field("key_algorithm", &self.key_algorithm)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        serde_json::from_str(json)
            .map_err(|e| ComputeError::LoginFailed(format!("malformed service account key: {}", e)))
    }
}

/// Reads the service-account key file on every load
#[derive(Debug, Clone)]
pub struct FileCredentialSource {
    path: PathBuf,
}

impl FileCredentialSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CredentialSource for FileCredentialSource {
    async fn load(&self) -> Result<ServiceAccountKey, ComputeError> {
        let json = tokio::fs::read_to_string(&self.path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ComputeError::LoginFailed(format!(
                "credentials file not found: {}",
                self.path.display()
            )),
            _ => ComputeError::LoginFailed(format!(
                "failed to read credentials {}: {}",
                self.path.display(),
                e
            )),
        })?;
        ServiceAccountKey::from_json(&json)
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    jwt: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    #[serde(default)]
    iam_token: String,
    #[serde(default)]
    expires_at: Option<String>,
}

/// Mints tokens by posting a signed JWT to the IAM endpoint
#[derive(Clone)]
pub struct IamTokenIssuer<C: Clock = SystemClock> {
    endpoint: String,
    http: reqwest::Client,
    clock: C,
}

impl<C: Clock> IamTokenIssuer<C> {
    pub fn new(endpoint: impl Into<String>, clock: C) -> Self {
        Self { endpoint: endpoint.into(), http: reqwest::Client::new(), clock }
    }

    /// Signed JWT asserting the service account's identity
    pub fn sign(&self, key: &ServiceAccountKey) -> Result<String, ComputeError> {
        let iat = self.clock.epoch_ms() / 1000;
        let claims = Claims {
            iss: &key.service_account_id,
            aud: &self.endpoint,
            iat,
            exp: iat + JWT_TTL.as_secs(),
        };
        let mut header = Header::new(Algorithm::PS256);
        header.kid = Some(key.id.clone());

        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| ComputeError::LoginFailed(format!("unusable private key: {}", e)))?;
        jsonwebtoken::encode(&header, &claims, &signing_key)
            .map_err(|e| ComputeError::LoginFailed(format!("failed to sign jwt: {}", e)))
    }
}

#[async_trait]
impl<C: Clock> TokenIssuer for IamTokenIssuer<C> {
    async fn issue(&self, key: &ServiceAccountKey) -> Result<Token, ComputeError> {
        let jwt = self.sign(key)?;
        let response = self
            .http
            .post(&self.endpoint)
            .json(&TokenRequest { jwt: &jwt })
            .send()
            .await
            .map_err(|e| ComputeError::LoginFailed(format!("token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ComputeError::LoginFailed(format!(
                "token request rejected ({}): {}",
                status,
                body.trim()
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| ComputeError::LoginFailed(format!("malformed token response: {}", e)))?;
        let fallback = self.clock.epoch_ms() + JWT_TTL.as_millis() as u64;
        let expires_at_ms =
            body.expires_at.as_deref().and_then(parse_rfc3339_ms).unwrap_or(fallback);
        Ok(Token { value: body.iam_token, expires_at_ms })
    }
}

/// Parse an RFC 3339 timestamp into epoch milliseconds
pub(crate) fn parse_rfc3339_ms(raw: &str) -> Option<u64> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .ok()
        .and_then(|t| u64::try_from(t.timestamp_millis()).ok())
}

#[cfg(test)]
#[path = "iam_tests.rs"]
mod tests;
