//! G-Core DNS API client
//!
//! Implements [`DnsProvider`] over the G-Core DNS v2 REST API using reqwest
//! with rustls.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use urlencoding::encode;
use zeroize::Zeroizing;

use crate::constants::{GCORE_AUTH_SCHEME, GCORE_USER_AGENT};
use crate::error::ProviderError;
use crate::metrics;
use crate::provider::{unfqdn, DnsProvider, RecordSet, RecordType, Zone};

//==============================================================================
// Types
//==============================================================================

#[derive(Debug, Deserialize)]
struct ZoneResponse {
    #[serde(default)]
    id: Option<serde_json::Value>,
    name: String,
}

impl ZoneResponse {
    fn into_zone(self) -> Zone {
        let name = unfqdn(&self.name);
        let id = match self.id {
            Some(serde_json::Value::Number(n)) => n.to_string(),
            Some(serde_json::Value::String(s)) if !s.is_empty() => s,
            _ => name.clone(),
        };
        Zone { name, id }
    }
}

/// Record set body as sent to and returned by the API
#[derive(Debug, Serialize, Deserialize)]
struct RrSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ttl: Option<u32>,
    #[serde(default)]
    resource_records: Vec<ResourceRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ResourceRecord {
    #[serde(default)]
    content: Vec<serde_json::Value>,
}

impl ResourceRecord {
    /// First content element as a string; anything unusable maps to ""
    fn value(&self) -> String {
        match self.content.first() {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => String::new(),
        }
    }
}

impl RrSet {
    fn from_record_set(record_set: &RecordSet) -> Self {
        Self {
            ttl: record_set.ttl,
            resource_records: record_set
                .values
                .iter()
                .map(|v| ResourceRecord {
                    content: vec![serde_json::Value::String(v.clone())],
                })
                .collect(),
        }
    }

    fn into_record_set(self, name: &str, record_type: RecordType) -> RecordSet {
        RecordSet {
            name: unfqdn(name),
            record_type,
            values: self.resource_records.iter().map(ResourceRecord::value).collect(),
            ttl: self.ttl,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(alias = "message")]
    error: String,
}

//==============================================================================
// Client
//==============================================================================

pub struct GcoreClient {
    api_url: String,
    api_token: Zeroizing<String>,
    client: reqwest::Client,
}

impl GcoreClient {
    pub fn new(api_url: &str, api_token: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .user_agent(GCORE_USER_AGENT)
            .build()
            .context("build reqwest client")?;

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            api_token: Zeroizing::new(api_token.to_string()),
            client,
        })
    }

    fn zone_url(&self, zone: &str) -> String {
        format!("{}/v2/zones/{}", self.api_url, encode(zone))
    }

    fn rrset_url(&self, zone: &str, name: &str, record_type: RecordType) -> String {
        format!(
            "{}/v2/zones/{}/{}/{}",
            self.api_url,
            encode(zone),
            encode(&unfqdn(name)),
            record_type.as_str()
        )
    }

    /// Sends an authenticated request, timing it under `operation`
    async fn execute(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<Response, ProviderError> {
        let _timer = metrics::start_provider_timer(operation);
        request
            .header(
                AUTHORIZATION,
                format!("{} {}", GCORE_AUTH_SCHEME, self.api_token.as_str()),
            )
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("{} request failed: {}", operation, e)))
    }
}

#[async_trait]
impl DnsProvider for GcoreClient {
    fn name(&self) -> &'static str {
        "gcore"
    }

    async fn find_zone(&self, name: &str) -> Result<Option<Zone>, ProviderError> {
        let url = self.zone_url(&unfqdn(name));
        debug!("GET {}", url);
        let resp = self.execute("find_zone", self.client.get(&url)).await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(error_from_response(resp).await);
        }
        let body: ZoneResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("failed to parse zone: {}", e)))?;
        Ok(Some(body.into_zone()))
    }

    async fn get_record_set(
        &self,
        zone: &Zone,
        name: &str,
        record_type: RecordType,
    ) -> Result<Option<RecordSet>, ProviderError> {
        let url = self.rrset_url(&zone.name, name, record_type);
        debug!("GET {}", url);
        let resp = self.execute("get_record_set", self.client.get(&url)).await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(error_from_response(resp).await);
        }
        let body: RrSet = resp
            .json()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("failed to parse rrset: {}", e)))?;
        Ok(Some(body.into_record_set(name, record_type)))
    }

    async fn put_record_set(
        &self,
        zone: &Zone,
        record_set: &RecordSet,
    ) -> Result<(), ProviderError> {
        let url = self.rrset_url(&zone.name, &record_set.name, record_set.record_type);
        let payload = RrSet::from_record_set(record_set);

        debug!("PUT {}", url);
        let resp = self
            .execute("put_record_set", self.client.put(&url).json(&payload))
            .await?;
        if resp.status().is_success() {
            return Ok(());
        }
        if resp.status() != StatusCode::NOT_FOUND {
            return Err(error_from_response(resp).await);
        }

        // PUT only replaces; a missing record set has to be created
        debug!("POST {}", url);
        let resp = self
            .execute("create_record_set", self.client.post(&url).json(&payload))
            .await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response(resp).await)
        }
    }

    async fn delete_record_set(
        &self,
        zone: &Zone,
        name: &str,
        record_type: RecordType,
    ) -> Result<(), ProviderError> {
        let url = self.rrset_url(&zone.name, name, record_type);
        debug!("DELETE {}", url);
        let resp = self
            .execute("delete_record_set", self.client.delete(&url))
            .await?;

        if resp.status().is_success() || resp.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Err(error_from_response(resp).await)
    }
}

//==============================================================================
// Helpers
//==============================================================================

async fn error_from_response(resp: Response) -> ProviderError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ApiError>(&body) {
        Ok(err) => err.error,
        Err(_) if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
        Err(_) => body.trim().to_string(),
    };
    classify_status(status, message)
}

/// Maps a non-success HTTP status onto a provider error kind
pub(crate) fn classify_status(status: StatusCode, message: String) -> ProviderError {
    let detail = format!("HTTP {}: {}", status.as_u16(), message);
    match status {
        StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => ProviderError::Conflict(detail),
        StatusCode::UNAUTHORIZED
        | StatusCode::FORBIDDEN
        | StatusCode::REQUEST_TIMEOUT
        | StatusCode::TOO_MANY_REQUESTS => ProviderError::Unavailable(detail),
        s if s.is_server_error() => ProviderError::Unavailable(detail),
        _ => ProviderError::Rejected(detail),
    }
}

//==============================================================================
// Tests
//==============================================================================
