//! Generic REST provider adapter
//!
//! Each provider module supplies a [`RestProfile`]: its name, default
//! resource metadata and rate-limit classification. The adapter itself only
//! forwards requests to its transport.

use async_trait::async_trait;
use driftflow_cloud::{
    CloudError, ProviderAdapter, ProviderRequest, ProviderResponse, ResourceMeta, Result,
    Transport,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Provider-specific behaviour of a [`RestAdapter`]
#[derive(Clone, Copy)]
pub struct RestProfile {
    pub name: &'static str,

    /// Default metadata for a resource-type tag
    pub defaults: fn(&str) -> ResourceMeta,

    pub is_rate_limited: fn(&CloudError) -> bool,
}

/// REST adapter for one provider account
pub struct RestAdapter {
    profile: RestProfile,
    transport: Arc<dyn Transport>,
    context: BTreeMap<String, String>,
}

impl RestAdapter {
    pub fn new(profile: RestProfile, transport: Arc<dyn Transport>) -> Self {
        Self {
            profile,
            transport,
            context: BTreeMap::new(),
        }
    }

    /// Add a provider-wide template value; empty values are ignored
    pub fn with_context(mut self, key: impl Into<String>, value: Option<String>) -> Self {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            self.context.insert(key.into(), value);
        }
        self
    }
}

#[async_trait]
impl ProviderAdapter for RestAdapter {
    fn name(&self) -> &str {
        self.profile.name
    }

    fn context(&self) -> &BTreeMap<String, String> {
        &self.context
    }

    fn defaults(&self, kind: &str) -> ResourceMeta {
        (self.profile.defaults)(kind)
    }

    async fn send(&self, request: &ProviderRequest) -> Result<ProviderResponse> {
        self.transport.send(request).await
    }

    fn is_rate_limited(&self, error: &CloudError) -> bool {
        (self.profile.is_rate_limited)(error)
    }
}

/// Last segment of a resource-type tag (`Hetzner::Cloud::FloatingIp` → `FloatingIp`)
pub(crate) fn type_name(kind: &str) -> &str {
    kind.rsplit(|c| c == ':' || c == '/' || c == '.')
        .find(|s| !s.is_empty())
        .unwrap_or(kind)
}

/// `FloatingIp` → `floating_ip`
pub(crate) fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// `floating_ip` → `floating_ips`, `policy` → `policies`
pub(crate) fn plural(singular: &str) -> String {
    if let Some(stem) = singular.strip_suffix('y') {
        if !stem.ends_with(['a', 'e', 'i', 'o', 'u']) {
            return format!("{stem}ies");
        }
    }
    if singular.ends_with('s') || singular.ends_with('x') {
        return format!("{singular}es");
    }
    format!("{singular}s")
}

/// Whether an API error message carries one of `markers`
pub(crate) fn message_has(error: &CloudError, markers: &[&str]) -> bool {
    match error {
        CloudError::ApiError { message, .. } => markers.iter().any(|m| message.contains(m)),
        _ => false,
    }
}
