//! Provider adapter abstraction
//!
//! A [`ProviderAdapter`] is the strategy object for one cloud: it knows how
//! to reach the provider ([`Transport`]), which credentials and context
//! values it needs, and the default metadata of its resource types.

use crate::error::{CloudError, Result};
use crate::lro::{LroProtocol, LroStyle};
use crate::metadata::{ResourceMeta, ResourceProfile};
use crate::params::{Method, Target};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

/// A single call against a provider
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    pub method: Method,
    pub target: Target,
    pub body: Option<Value>,
    /// Overrides the transport's base URL for path targets
    pub base_url: Option<String>,
}

impl ProviderRequest {
    pub fn new(method: Method, target: Target) -> Self {
        Self {
            method,
            target,
            body: None,
            base_url: None,
        }
    }

    pub fn get(target: Target) -> Self {
        Self::new(Method::Get, target)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url;
        self
    }
}

/// A provider's answer. CLI transports report status 200 on success.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    pub status: u16,
    /// Header names are lowercase
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

impl ProviderResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body,
        }
    }

    pub fn ok(body: Value) -> Self {
        Self::new(200, body)
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Wire-level access to a provider (HTTP client, CLI process, ...)
///
/// Implementations map "not found" to [`CloudError::ResourceNotFound`] and
/// other failures to [`CloudError::ApiError`] carrying the status when known.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ProviderRequest) -> Result<ProviderResponse>;
}

/// Cloud provider strategy
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Provider name, used in logs
    fn name(&self) -> &str;

    /// Provider-wide template values (project, subscription, region, ...)
    fn context(&self) -> &BTreeMap<String, String>;

    /// Default metadata for a resource type; `domain.extra` overrides it
    fn defaults(&self, kind: &str) -> ResourceMeta;

    async fn send(&self, request: &ProviderRequest) -> Result<ProviderResponse>;

    /// Whether an error should be retried with backoff
    fn is_rate_limited(&self, error: &CloudError) -> bool {
        error.status() == Some(429)
    }

    fn lro_protocol(&self, style: LroStyle) -> Option<Box<dyn LroProtocol>> {
        style.protocol()
    }

    /// Resource state inside a GET response body
    fn read_payload(&self, profile: &ResourceProfile, body: Value) -> Result<Value> {
        Ok(profile.unwrap_envelope(body))
    }
}
