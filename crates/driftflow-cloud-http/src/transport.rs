//! reqwest-based transport with bearer authentication

use crate::error::{HttpError, Result};
use async_trait::async_trait;
use driftflow_cloud::{CloudError, Method, ProviderRequest, ProviderResponse, Target, Transport};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP client for one provider API
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    token: String,
    headers: Vec<(String, String)>,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("driftflow/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            token: token.into(),
            headers: Vec::new(),
        })
    }

    /// Send `name: value` with every request
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL and query pairs for a request target.
    pub fn url_for(&self, request: &ProviderRequest) -> Result<(Url, Vec<(String, String)>)> {
        match &request.target {
            Target::Path { path, query } => {
                let base = request.base_url.as_deref().unwrap_or(&self.base_url);
                Ok((join_url(base, path)?, query.clone()))
            }
            Target::Url(url) => Ok((Url::parse(url)?, Vec::new())),
            Target::Args(args) => Err(HttpError::UnsupportedTarget(
                args.iter().take(2).cloned().collect::<Vec<_>>().join(" "),
            )),
        }
    }

    async fn execute(&self, request: &ProviderRequest) -> Result<ProviderResponse> {
        let (url, query) = self.url_for(request)?;
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method.clone(), url.clone())
            .bearer_auth(&self.token);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        if let Some(body) = &request.body {
            if method != reqwest::Method::GET {
                builder = builder.json(body);
            }
        }

        tracing::debug!(%method, %url, "HTTP request");
        let response = builder.send().await?;
        let status = response.status();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let text = response.text().await?;
        tracing::debug!(status = status.as_u16(), %url, "HTTP response");

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CloudError::ResourceNotFound(format!("{method} {url}")).into());
        }
        if !status.is_success() {
            let message = match text.trim() {
                "" => status.to_string(),
                body => format!("{status}: {body}"),
            };
            return Err(CloudError::api(Some(status.as_u16()), message).into());
        }

        Ok(ProviderResponse {
            status: status.as_u16(),
            headers,
            body: parse_body(&text),
        })
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ProviderRequest) -> driftflow_cloud::Result<ProviderResponse> {
        self.execute(request).await.map_err(Into::into)
    }
}

/// Resolve `path` under `base`, keeping the base's own path prefix (`/v1`, `/v2`).
fn join_url(base: &str, path: &str) -> Result<Url> {
    let mut base = Url::parse(base)?;
    if !base.path().ends_with('/') {
        let prefixed = format!("{}/", base.path());
        base.set_path(&prefixed);
    }
    Ok(base.join(path.trim_start_matches('/'))?)
}

/// Empty bodies become `null`, non-JSON bodies a string.
fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_url_for_path_and_override() {
        let transport = HttpTransport::new("https://api.hetzner.cloud/v1/", "t").unwrap();
        let request = ProviderRequest::get(Target::Path {
            path: "/servers/42".to_string(),
            query: vec![("page".to_string(), "2".to_string())],
        });

        let (url, query) = transport.url_for(&request).unwrap();
        assert_eq!(url.as_str(), "https://api.hetzner.cloud/v1/servers/42");
        assert_eq!(query, vec![("page".to_string(), "2".to_string())]);

        let request = request.with_base_url(Some("https://eu.example.com".to_string()));
        assert_eq!(
            transport.url_for(&request).unwrap().0.as_str(),
            "https://eu.example.com/servers/42"
        );
    }

    #[test]
    fn test_absolute_links_are_used_verbatim() {
        let transport = HttpTransport::new("https://graph.microsoft.com/v1.0", "t").unwrap();
        let link = "https://graph.microsoft.com/v1.0/groups?$skiptoken=abc";
        let request = ProviderRequest::get(Target::Url(link.to_string()));
        let (url, query) = transport.url_for(&request).unwrap();
        assert_eq!(url.as_str(), link);
        assert!(query.is_empty());
    }

    #[test]
    fn test_base_url_without_scheme_is_a_config_error() {
        let transport = HttpTransport::new("api.example.com/v1", "t").unwrap();
        let request = ProviderRequest::get(Target::Path {
            path: "/servers".to_string(),
            query: Vec::new(),
        });
        let err: CloudError = transport.url_for(&request).unwrap_err().into();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_cli_targets_are_rejected() {
        let transport = HttpTransport::new("https://x", "t").unwrap();
        let request = ProviderRequest::get(Target::Args(vec!["cloudcontrol".into(), "get-resource".into()]));
        let err: CloudError = transport.url_for(&request).unwrap_err().into();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(""), Value::Null);
        assert_eq!(parse_body("{\"a\":1}"), json!({"a": 1}));
        assert_eq!(parse_body("Accepted"), json!("Accepted"));
    }

    #[test]
    fn test_debug_hides_token() {
        let transport = HttpTransport::new("https://x", "super-secret").unwrap();
        assert!(!format!("{transport:?}").contains("super-secret"));
    }
}
