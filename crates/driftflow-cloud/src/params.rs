//! Request target resolution
//!
//! Renders an endpoint template (an HTTP path or a CLI argument list) from a
//! component's declared and observed state. Every `{name}` placeholder must
//! resolve to a non-empty value; query parameters are only sent when the
//! endpoint declares them.

use crate::component::Component;
use crate::error::{CloudError, Result};
use crate::value::scalar_string;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use url::Url;

/// Binding name under which request bodies are exposed to CLI templates
pub const PAYLOAD_PARAM: &str = "payload";

/// Binding name for the component's provider resource id
pub const RESOURCE_ID_PARAM: &str = "resourceId";

/// Binding name for the resolved resource-type name
pub const RESOURCE_TYPE_PARAM: &str = "resourceType";

/// HTTP method (CLI endpoints carry one too, for intent)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// Endpoint template: an HTTP path or a CLI argument list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Template {
    Path(String),
    Args(Vec<String>),
}

/// One API call shape for a resource type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    #[serde(default)]
    pub method: Method,

    pub template: Template,

    /// Query parameters this endpoint accepts
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query: Vec<String>,
}

impl Endpoint {
    pub fn path(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            template: Template::Path(path.into()),
            query: Vec::new(),
        }
    }

    pub fn args<I, S>(method: Method, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method,
            template: Template::Args(args.into_iter().map(Into::into).collect()),
            query: Vec::new(),
        }
    }

    pub fn with_query<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query = names.into_iter().map(Into::into).collect();
        self
    }
}

/// Fully resolved request target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Path relative to the provider base URL
    Path {
        path: String,
        query: Vec<(String, String)>,
    },
    /// Absolute URL handed out by the provider (next-page links, operation URLs)
    Url(String),
    /// CLI argument list
    Args(Vec<String>),
}

impl Target {
    /// Append a query parameter (path targets) or a flag/value pair (CLI targets).
    pub fn push_param(&mut self, name: &str, value: &str) {
        match self {
            Target::Path { query, .. } => query.push((name.to_string(), value.to_string())),
            Target::Url(url) => match Url::parse(url) {
                Ok(mut parsed) => {
                    parsed.query_pairs_mut().append_pair(name, value);
                    *url = parsed.into();
                }
                Err(e) => tracing::warn!(%url, "Cannot add {} to unparsable link: {}", name, e),
            },
            Target::Args(args) => {
                args.push(name.to_string());
                args.push(value.to_string());
            }
        }
    }

    /// Short form for logs. CLI arguments past the subcommand may carry payloads.
    pub fn summary(&self) -> String {
        match self {
            Target::Args(args) => args.iter().take(2).cloned().collect::<Vec<_>>().join(" "),
            other => other.to_string(),
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Path { path, query } if query.is_empty() => f.write_str(path),
            Target::Path { path, query } => {
                let pairs: Vec<String> = query.iter().map(|(k, v)| format!("{k}={v}")).collect();
                write!(f, "{}?{}", path, pairs.join("&"))
            }
            Target::Url(url) => f.write_str(url),
            Target::Args(args) => f.write_str(&args.join(" ")),
        }
    }
}

/// Where placeholder values come from, in lookup order:
/// bindings, provider context, resource id, `domain.extra`, `domain`, `resource.payload`.
pub struct ParamSource<'a> {
    bindings: BTreeMap<String, String>,
    context: &'a BTreeMap<String, String>,
    component: &'a Component,
}

impl<'a> ParamSource<'a> {
    pub fn new(component: &'a Component, context: &'a BTreeMap<String, String>) -> Self {
        Self {
            bindings: BTreeMap::new(),
            context,
            component,
        }
    }

    pub fn bind(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.bindings.insert(name.into(), value.into());
        self
    }

    pub fn lookup(&self, name: &str) -> Option<String> {
        if let Some(v) = self.bindings.get(name).filter(|v| !v.is_empty()) {
            return Some(v.clone());
        }
        if let Some(v) = self.context.get(name).filter(|v| !v.is_empty()) {
            return Some(v.clone());
        }
        if name == RESOURCE_ID_PARAM {
            if let Some(id) = self.component.resource_id() {
                return Some(id.to_string());
            }
        }

        let from = |tree: Option<&Value>| tree.and_then(|t| t.get(name)).and_then(scalar_string);
        from(self.component.domain.get(crate::component::EXTRA_KEY))
            .or_else(|| from(Some(&self.component.domain)))
            .or_else(|| from(self.component.payload()))
    }

    /// Explicit query values declared under `domain.extra.query`
    fn declared_query(&self) -> BTreeMap<String, String> {
        self.component
            .extra()
            .and_then(|extra| extra.get("query"))
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| scalar_string(v).map(|s| (k.clone(), s)))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Render `endpoint` against `source`.
pub fn resolve(endpoint: &Endpoint, source: &ParamSource<'_>) -> Result<Target> {
    match &endpoint.template {
        Template::Path(template) => {
            let path = render(template, source, encode_segment)?;

            let declared = source.declared_query();
            for name in declared.keys() {
                if !endpoint.query.contains(name) {
                    tracing::debug!(param = %name, "Dropping query parameter not accepted by endpoint");
                }
            }

            let query = endpoint
                .query
                .iter()
                .filter_map(|name| {
                    declared
                        .get(name)
                        .cloned()
                        .or_else(|| source.lookup(name))
                        .map(|value| (name.clone(), value))
                })
                .collect();

            Ok(Target::Path { path, query })
        }
        Template::Args(args) => {
            let args = args
                .iter()
                .map(|arg| render(arg, source, |s| s.to_string()))
                .collect::<Result<Vec<_>>>()?;
            Ok(Target::Args(args))
        }
    }
}

/// Substitute `{name}` placeholders in `template`.
fn render(
    template: &str,
    source: &ParamSource<'_>,
    encode: impl Fn(&str) -> String,
) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after.find('}').ok_or_else(|| {
            CloudError::MalformedMetadata(format!("unterminated placeholder in template {template}"))
        })?;
        let name = &after[..end];
        if name.is_empty() {
            return Err(CloudError::MalformedMetadata(format!(
                "empty placeholder in template {template}"
            )));
        }

        let value = source
            .lookup(name)
            .ok_or_else(|| CloudError::MissingParameter(name.to_string()))?;
        out.push_str(&encode(&value));
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Percent-encode a path value, keeping `/` so hierarchical ids stay intact.
fn encode_segment(value: &str) -> String {
    value
        .split('/')
        .map(|segment| urlencoding::encode(segment))
        .collect::<Vec<_>>()
        .join("/")
}
