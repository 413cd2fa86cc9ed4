// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token cache guarding access to the compute control plane.
//!
//! The cache owns the token and the channel opened with it. A caller that
//! finds no session, or an expired one, refreshes while holding the cache
//! lock, so concurrent callers wait for that single refresh instead of each
//! minting a token and tearing down the other's channel.

use crate::iam::ServiceAccountKey;
use crate::ComputeError;
use async_trait::async_trait;
use std::sync::Arc;
use tender_core::{Clock, SystemClock};
use tokio::sync::Mutex;

/// Capability token for the control plane
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    pub value: String,
    pub expires_at_ms: u64,
}

impl Token {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.expires_at_ms < now_ms
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token").field("expires_at_ms", &self.expires_at_ms).finish_non_exhaustive()
    }
}

/// Loads the credential material tokens are minted from
#[async_trait]
pub trait CredentialSource: Send + Sync + 'static {
    async fn load(&self) -> Result<ServiceAccountKey, ComputeError>;
}

/// Exchanges credential material for a token
#[async_trait]
pub trait TokenIssuer: Send + Sync + 'static {
    async fn issue(&self, key: &ServiceAccountKey) -> Result<Token, ComputeError>;
}

/// Opens the channel API calls are made on, given a fresh token
pub type ChannelOpener<Ch> = Box<dyn Fn(&Token) -> Result<Ch, ComputeError> + Send + Sync>;

struct Session<Ch> {
    token: Token,
    channel: Arc<Ch>,
}

pub struct TokenCache<Ch, C: Clock = SystemClock> {
    credentials: Arc<dyn CredentialSource>,
    issuer: Arc<dyn TokenIssuer>,
    opener: ChannelOpener<Ch>,
    clock: C,
    session: Mutex<Option<Session<Ch>>>,
}

impl<Ch, C> TokenCache<Ch, C>
where
    Ch: Send + Sync + 'static,
    C: Clock,
{
    pub fn new(
        credentials: Arc<dyn CredentialSource>,
        issuer: Arc<dyn TokenIssuer>,
        opener: ChannelOpener<Ch>,
        clock: C,
    ) -> Self {
        Self { credentials, issuer, opener, clock, session: Mutex::new(None) }
    }

    /// Channel backed by an unexpired token, refreshing first if needed.
    pub async fn channel(&self) -> Result<Arc<Ch>, ComputeError> {
        let mut session = self.session.lock().await;
        let now = self.clock.epoch_ms();
        if let Some(current) = session.as_ref().filter(|s| !s.token.is_expired(now)) {
            return Ok(Arc::clone(&current.channel));
        }

        let key = self.credentials.load().await?;
        if session.take().is_some() {
            tracing::debug!("closing control-plane channel with expired token");
        }

        let token = self.issuer.issue(&key).await?;
        if token.value.trim().is_empty() {
            return Err(ComputeError::LoginFailed("failed to login".to_string()));
        }

        let channel = Arc::new((self.opener)(&token)?);
        tracing::info!(
            service_account = %key.service_account_id,
            expires_at_ms = token.expires_at_ms,
            "opened control-plane channel"
        );
        *session = Some(Session { token, channel: Arc::clone(&channel) });
        Ok(channel)
    }

    /// Drop the cached session so the next call refreshes
    pub async fn invalidate(&self) {
        *self.session.lock().await = None;
    }
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
