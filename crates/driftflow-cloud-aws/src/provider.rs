//! AWS Cloud Control provider
//!
//! Every `AWS::*` type is driven through the Cloud Control API:
//! `create-resource` with the full desired state, `update-resource` with a
//! JSON Patch document, and `get-resource-request-status` until the request
//! token settles. The component's region comes from `domain.extra.region`.

use crate::cli::AwsCli;
use async_trait::async_trait;
use driftflow_cloud::{
    CloudError, CredentialResolver, Endpoint, Endpoints, LroStyle, Method, PageMode, Pagination,
    ProviderAdapter, ProviderRequest, ProviderResponse, ResourceMeta, ResourceProfile, Result,
    RetryConfig, Transport, UpdateStyle,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

pub const PROFILE_VAR: &str = "AWS_PROFILE";

/// stderr markers of AWS throttling
const THROTTLING_MARKERS: &[&str] = &[
    "Throttling",
    "TooManyRequests",
    "RequestLimitExceeded",
    "ThrottlingException",
];

/// Cloud Control backoff: 20 attempts from 1s, capped at 90s
pub fn retry_config() -> RetryConfig {
    RetryConfig {
        max_attempts: 20,
        initial_delay: Duration::from_secs(1),
        max_delay: Duration::from_secs(90),
        ..RetryConfig::default()
    }
}

/// Cloud Control adapter
pub struct AwsAdapter {
    transport: Arc<dyn Transport>,
    context: BTreeMap<String, String>,
}

impl AwsAdapter {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            context: BTreeMap::new(),
        }
    }

    /// Adapter over the `aws` binary; the CLI resolves its own credentials.
    pub fn from_credentials(credentials: &dyn CredentialResolver) -> Result<Self> {
        let cli = AwsCli::default().with_profile(credentials.get(PROFILE_VAR));
        Ok(Self::new(Arc::new(cli)))
    }
}

fn cloudcontrol(command: &str, tail: &[&str]) -> Endpoint {
    let mut args = vec![
        "cloudcontrol",
        command,
        "--region",
        "{region}",
        "--type-name",
        "{resourceType}",
    ];
    args.extend_from_slice(tail);
    Endpoint::args(Method::Get, args)
}

/// Cloud Control metadata shared by every `AWS::*` type
pub fn defaults() -> ResourceMeta {
    let with_method = |endpoint: Endpoint, method: Method| Endpoint { method, ..endpoint };

    ResourceMeta {
        endpoints: Endpoints {
            list: Some(cloudcontrol("list-resources", &[])),
            get: Some(cloudcontrol("get-resource", &["--identifier", "{resourceId}"])),
            create: Some(with_method(
                cloudcontrol("create-resource", &["--desired-state", "{payload}"]),
                Method::Post,
            )),
            update: Some(with_method(
                cloudcontrol(
                    "update-resource",
                    &["--identifier", "{resourceId}", "--patch-document", "{payload}"],
                ),
                Method::Patch,
            )),
            delete: Some(with_method(
                cloudcontrol("delete-resource", &["--identifier", "{resourceId}"]),
                Method::Delete,
            )),
            poll: Some(Endpoint::args(
                Method::Get,
                [
                    "cloudcontrol",
                    "get-resource-request-status",
                    "--region",
                    "{region}",
                    "--request-token",
                    "{requestToken}",
                ],
            )),
        },
        lro_style: Some(LroStyle::CloudControl),
        update_style: Some(UpdateStyle::JsonPatch),
        pagination: Some(Pagination {
            items: "/ResourceDescriptions".to_string(),
            next: Some("/NextToken".to_string()),
            id: Some("/Identifier".to_string()),
            mode: PageMode::Token {
                param: "--next-token".to_string(),
            },
        }),
        id_field: Some("/Identifier".to_string()),
        ..Default::default()
    }
}

#[async_trait]
impl ProviderAdapter for AwsAdapter {
    fn name(&self) -> &str {
        "aws"
    }

    fn context(&self) -> &BTreeMap<String, String> {
        &self.context
    }

    fn defaults(&self, _kind: &str) -> ResourceMeta {
        defaults()
    }

    async fn send(&self, request: &ProviderRequest) -> Result<ProviderResponse> {
        self.transport.send(request).await
    }

    fn is_rate_limited(&self, error: &CloudError) -> bool {
        let message = error.to_string();
        THROTTLING_MARKERS.iter().any(|m| message.contains(m))
    }

    /// `ResourceDescription.Properties` is a JSON document encoded as a string
    fn read_payload(&self, profile: &ResourceProfile, body: Value) -> Result<Value> {
        match body.pointer("/ResourceDescription/Properties") {
            Some(Value::String(properties)) => Ok(serde_json::from_str(properties)?),
            Some(properties) => Ok(properties.clone()),
            None => Ok(profile.unwrap_envelope(body)),
        }
    }
}
