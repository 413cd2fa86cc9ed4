// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON REST client for the compute API.
//!
//! Every call fetches its channel from the [`TokenCache`], so an expired
//! token is replaced before the request goes out. A 401 drops the cached
//! session so the following call re-authenticates.

use super::{ComputeError, ComputeService, CreateInstanceSpec, InstanceFilter, Operation};
use crate::iam::{parse_rfc3339_ms, FileCredentialSource, IamTokenIssuer};
use crate::token::{ChannelOpener, Token, TokenCache};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tender_core::{
    Clock, CloudConfig, Instance, InstanceId, InstanceStatus, NetworkInterface, OperationId,
    SystemClock,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const PAGE_SIZE: u32 = 100;

/// HTTP client bound to one bearer token
#[derive(Debug, Clone)]
pub struct ApiChannel {
    http: reqwest::Client,
    bearer: String,
}

impl ApiChannel {
    pub fn open(token: &Token) -> Result<Self, ComputeError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ComputeError::Client(format!("failed to build http client: {}", e)))?;
        Ok(Self { http, bearer: token.value.clone() })
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http.request(method, url).bearer_auth(&self.bearer)
    }
}

pub struct RestComputeClient<C: Clock = SystemClock> {
    base_url: String,
    tokens: Arc<TokenCache<ApiChannel, C>>,
}

impl RestComputeClient<SystemClock> {
    /// Client authenticating with the cloud's service-account key file
    pub fn from_config(cloud: &CloudConfig) -> Self {
        let opener: ChannelOpener<ApiChannel> = Box::new(ApiChannel::open);
        let tokens = TokenCache::new(
            Arc::new(FileCredentialSource::new(&cloud.credentials_file)),
            Arc::new(IamTokenIssuer::new(&cloud.iam_endpoint, SystemClock)),
            opener,
            SystemClock,
        );
        Self::new(&cloud.compute_endpoint, Arc::new(tokens))
    }
}

impl<C: Clock> RestComputeClient<C> {
    pub fn new(base_url: &str, tokens: Arc<TokenCache<ApiChannel, C>>) -> Self {
        Self { base_url: base_url.trim_end_matches('/').to_string(), tokens }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/compute/v1/{}", self.base_url, path)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        build: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<Response, ComputeError> {
        let channel = self.tokens.channel().await?;
        let request = build(channel.request(method, &self.url(path)));
        let response = request.send().await.map_err(|e| ComputeError::Client(e.to_string()))?;
        if response.status() == StatusCode::UNAUTHORIZED {
            self.tokens.invalidate().await;
        }
        Ok(response)
    }

    async fn operation(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Operation, ComputeError> {
        let response = self
            .send(method, path, |req| match body {
                Some(body) => req.json(&body),
                None => req,
            })
            .await?;
        let dto: OperationDto = decode(response).await?;
        Ok(dto.into())
    }
}

#[async_trait]
impl<C: Clock> ComputeService for RestComputeClient<C> {
    async fn create(&self, spec: &CreateInstanceSpec) -> Result<Operation, ComputeError> {
        tracing::debug!(name = %spec.name, folder_id = %spec.folder_id, "create instance");
        self.operation(Method::POST, "instances", Some(spec.to_request())).await
    }

    async fn start(&self, id: &InstanceId) -> Result<Operation, ComputeError> {
        self.operation(Method::POST, &format!("instances/{}:start", id), None).await
    }

    async fn stop(&self, id: &InstanceId) -> Result<Operation, ComputeError> {
        self.operation(Method::POST, &format!("instances/{}:stop", id), None).await
    }

    async fn delete(&self, id: &InstanceId) -> Result<Operation, ComputeError> {
        self.operation(Method::DELETE, &format!("instances/{}", id), None).await
    }

    async fn get(&self, id: &InstanceId) -> Result<Option<Instance>, ComputeError> {
        let response = self.send(Method::GET, &format!("instances/{}", id), |req| req).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let dto: InstanceDto = decode(response).await?;
        Ok(Some(dto.into()))
    }

    async fn list(&self, filter: &InstanceFilter) -> Result<Vec<Instance>, ComputeError> {
        let mut instances = Vec::new();
        let mut page_token = String::new();
        loop {
            let mut query = vec![
                ("folderId", filter.folder_id.clone()),
                ("filter", filter.expression()),
                ("pageSize", PAGE_SIZE.to_string()),
            ];
            if !page_token.is_empty() {
                query.push(("pageToken", page_token.clone()));
            }
            let response = self.send(Method::GET, "instances", |req| req.query(&query)).await?;
            let page: ListDto = decode(response).await?;
            instances.extend(page.instances.into_iter().map(Instance::from));
            if page.next_page_token.is_empty() {
                return Ok(instances);
            }
            page_token = page.next_page_token;
        }
    }
}

async fn decode<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T, ComputeError> {
    let status = response.status();
    let body = response.text().await.map_err(|e| ComputeError::Client(e.to_string()))?;
    if !status.is_success() {
        let message = serde_json::from_str::<StatusDto>(&body)
            .map(|s| s.message)
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| body.trim().to_string());
        return Err(ComputeError::Client(format!("{}: {}", status.as_u16(), message)));
    }
    serde_json::from_str(&body)
        .map_err(|e| ComputeError::Client(format!("malformed response: {}", e)))
}

// ── Wire types ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct StatusDto {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationDto {
    #[serde(default)]
    id: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<StatusDto>,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
}

impl From<OperationDto> for Operation {
    fn from(dto: OperationDto) -> Self {
        let instance_id = dto
            .metadata
            .as_ref()
            .and_then(|m| m.get("instanceId"))
            .and_then(|v| v.as_str())
            .map(InstanceId::from);
        Operation {
            id: OperationId::new(dto.id),
            done: dto.done,
            error: dto.error.map(|e| e.message),
            instance_id,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDto {
    #[serde(default)]
    instances: Vec<InstanceDto>,
    #[serde(default)]
    next_page_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstanceDto {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    folder_id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    network_interfaces: Vec<NicDto>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NicDto {
    #[serde(default)]
    primary_v4_address: Option<AddressDto>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddressDto {
    #[serde(default)]
    address: String,
    #[serde(default)]
    one_to_one_nat: Option<NatDto>,
}

#[derive(Deserialize)]
struct NatDto {
    #[serde(default)]
    address: String,
}

impl From<InstanceDto> for Instance {
    fn from(dto: InstanceDto) -> Self {
        let interfaces = dto
            .network_interfaces
            .into_iter()
            .map(|nic| match nic.primary_v4_address {
                Some(addr) => NetworkInterface {
                    primary_v4: Some(addr.address).filter(|a| !a.is_empty()),
                    nat_v4: addr.one_to_one_nat.map(|n| n.address).filter(|a| !a.is_empty()),
                },
                None => NetworkInterface::default(),
            })
            .collect();
        Instance {
            id: InstanceId::new(dto.id),
            name: dto.name,
            folder_id: dto.folder_id,
            status: InstanceStatus::parse(&dto.status),
            created_at_ms: dto.created_at.as_deref().and_then(parse_rfc3339_ms).unwrap_or(0),
            interfaces,
        }
    }
}

#[cfg(test)]
#[path = "rest_tests.rs"]
mod tests;
