//! Per-resource-type metadata
//!
//! Everything the executor needs to know about a resource type comes from
//! `domain.extra`, layered over the defaults of the provider adapter:
//!
//! ```yaml
//! extra:
//!   resourceType: Hetzner::Cloud::Server
//!   propUsageMap: '{"createOnly":["name","server_type","image"],"updatable":["labels"]}'
//!   lroStyle: hetznerAction
//!   updateStyle: put
//!   envelope: server
//!   idField: /server/id
//!   endpoints:
//!     list:   { method: GET, template: /servers }
//!     get:    { method: GET, template: "/servers/{resourceId}" }
//! ```

use crate::classify::PropertyUsageMap;
use crate::error::{CloudError, Result};
use crate::lro::LroStyle;
use crate::params::Endpoint;
use crate::schema::SchemaHints;
use crate::component::Component;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How updates are sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpdateStyle {
    /// Full replacement: the updatable payload merged over the observed state
    Put,
    /// Partial update with the updatable payload only
    #[default]
    Patch,
    /// RFC 6902 diff between live state and live state merged with the payload
    JsonPatch,
}

/// Endpoint table of a resource type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Endpoints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list: Option<Endpoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<Endpoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<Endpoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<Endpoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<Endpoint>,
    /// Operation status endpoint for handles that carry bindings instead of URLs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll: Option<Endpoint>,
}

impl Endpoints {
    /// Fill unset entries from `base`.
    fn or(self, base: Endpoints) -> Endpoints {
        Endpoints {
            list: self.list.or(base.list),
            get: self.get.or(base.get),
            create: self.create.or(base.create),
            update: self.update.or(base.update),
            delete: self.delete.or(base.delete),
            poll: self.poll.or(base.poll),
        }
    }
}

/// How list responses page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PageMode {
    /// The next-page value is a token sent back as `param`
    Token { param: String },
    /// The next-page value is an absolute URL
    Link,
}

/// List response layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// JSON pointer to the item array
    #[serde(default)]
    pub items: String,

    /// JSON pointer to the next-page token or link
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,

    /// JSON pointer to an item's resource id, falling back to the type's `idField`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub mode: PageMode,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            items: String::new(),
            next: None,
            id: None,
            mode: PageMode::Link,
        }
    }
}

/// Partially specified resource metadata, as found in `domain.extra` or adapter defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Object or JSON-encoded string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prop_usage_map: Option<Value>,

    #[serde(default)]
    pub endpoints: Endpoints,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lro_style: Option<LroStyle>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_style: Option<UpdateStyle>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,

    /// JSON pointer to the resource id inside a resource body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_field: Option<String>,

    /// Key wrapping single-resource bodies (`{"server": {...}}`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub envelope: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaHints>,
}

impl ResourceMeta {
    /// Layer `self` over `base`; fields set in `self` win.
    pub fn or(self, base: ResourceMeta) -> ResourceMeta {
        ResourceMeta {
            resource_type: self.resource_type.or(base.resource_type),
            base_url: self.base_url.or(base.base_url),
            prop_usage_map: self.prop_usage_map.or(base.prop_usage_map),
            endpoints: self.endpoints.or(base.endpoints),
            lro_style: self.lro_style.or(base.lro_style),
            update_style: self.update_style.or(base.update_style),
            pagination: self.pagination.or(base.pagination),
            id_field: self.id_field.or(base.id_field),
            envelope: self.envelope.or(base.envelope),
            schema: self.schema.or(base.schema),
        }
    }
}

/// Endpoint roles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    List,
    Get,
    Create,
    Update,
    Delete,
    Poll,
}

impl std::fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EndpointKind::List => "list",
            EndpointKind::Get => "get",
            EndpointKind::Create => "create",
            EndpointKind::Update => "update",
            EndpointKind::Delete => "delete",
            EndpointKind::Poll => "poll",
        };
        f.write_str(name)
    }
}

/// Fully resolved metadata of one resource type
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceProfile {
    pub resource_type: String,
    pub base_url: Option<String>,
    usage: Option<PropertyUsageMap>,
    pub endpoints: Endpoints,
    pub lro_style: LroStyle,
    pub update_style: UpdateStyle,
    pub pagination: Pagination,
    pub id_field: Option<String>,
    pub envelope: Option<String>,
    pub schema: SchemaHints,
}

impl ResourceProfile {
    /// Resolve a component's `domain.extra` over adapter `defaults`.
    ///
    /// A malformed usage map is rejected here, before any network call.
    pub fn resolve(component: &Component, defaults: ResourceMeta) -> Result<Self> {
        let declared = match component.extra() {
            Some(extra) => serde_json::from_value::<ResourceMeta>(Value::Object(extra.clone()))
                .map_err(|e| {
                    CloudError::MalformedMetadata(format!("domain.extra on {}: {}", component.id, e))
                })?,
            None => ResourceMeta::default(),
        };
        let meta = declared.or(defaults);

        let usage = meta
            .prop_usage_map
            .as_ref()
            .map(PropertyUsageMap::from_value)
            .transpose()
            .map_err(|e| match e {
                CloudError::MalformedMetadata(msg) => CloudError::MalformedMetadata(format!(
                    "malformed propUsageMap on {}: {}",
                    component.id, msg
                )),
                other => other,
            })?;

        Ok(Self {
            resource_type: meta.resource_type.unwrap_or_else(|| component.kind.clone()),
            base_url: meta.base_url,
            usage,
            endpoints: meta.endpoints,
            lro_style: meta.lro_style.unwrap_or_default(),
            update_style: meta.update_style.unwrap_or_default(),
            pagination: meta.pagination.unwrap_or_default(),
            id_field: meta.id_field,
            envelope: meta.envelope,
            schema: meta.schema.unwrap_or_default(),
        })
    }

    /// The usage map, required whenever a payload is built
    pub fn usage(&self) -> Result<&PropertyUsageMap> {
        self.usage.as_ref().ok_or_else(|| {
            CloudError::MalformedMetadata(format!(
                "propUsageMap is missing for {}",
                self.resource_type
            ))
        })
    }

    pub fn endpoint(&self, kind: EndpointKind) -> Result<&Endpoint> {
        let endpoint = match kind {
            EndpointKind::List => &self.endpoints.list,
            EndpointKind::Get => &self.endpoints.get,
            EndpointKind::Create => &self.endpoints.create,
            EndpointKind::Update => &self.endpoints.update,
            EndpointKind::Delete => &self.endpoints.delete,
            EndpointKind::Poll => &self.endpoints.poll,
        };
        endpoint.as_ref().ok_or_else(|| {
            CloudError::MalformedMetadata(format!(
                "no {} endpoint declared for {}",
                kind, self.resource_type
            ))
        })
    }

    /// Strip the single-resource envelope, if any.
    pub fn unwrap_envelope(&self, body: Value) -> Value {
        match (&self.envelope, body) {
            (Some(key), Value::Object(mut map)) if map.contains_key(key) => {
                map.remove(key).unwrap_or(Value::Null)
            }
            (_, body) => body,
        }
    }

    /// Resource id inside a resource body, enveloped or not.
    pub fn id_of(&self, body: &Value) -> Option<String> {
        let pointer = self.id_field.as_deref()?;
        let inner = self
            .envelope
            .as_deref()
            .and_then(|key| body.get(key))
            .and_then(|inner| inner.pointer(pointer));
        body.pointer(pointer)
            .or(inner)
            .and_then(crate::value::scalar_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{Method, Template};
    use serde_json::json;

    fn defaults() -> ResourceMeta {
        ResourceMeta {
            endpoints: Endpoints {
                get: Some(Endpoint::path(Method::Get, "/servers/{resourceId}")),
                delete: Some(Endpoint::path(Method::Delete, "/servers/{resourceId}")),
                ..Default::default()
            },
            lro_style: Some(LroStyle::HetznerAction),
            ..Default::default()
        }
    }

    #[test]
    fn test_extra_overrides_defaults() {
        let component = Component::new("c1", "Hetzner::Cloud::Server").with_domain(json!({
            "name": "web-1",
            "extra": {
                "region": "fsn1",
                "propUsageMap": "{\"createOnly\":[\"name\"],\"updatable\":[\"labels\"]}",
                "updateStyle": "put",
                "endpoints": {
                    "get": {"method": "GET", "template": "/v2/servers/{resourceId}"}
                }
            }
        }));

        let profile = ResourceProfile::resolve(&component, defaults()).unwrap();

        assert_eq!(profile.resource_type, "Hetzner::Cloud::Server");
        assert_eq!(profile.update_style, UpdateStyle::Put);
        assert_eq!(profile.lro_style, LroStyle::HetznerAction);
        assert_eq!(
            profile.endpoint(EndpointKind::Get).unwrap().template,
            Template::Path("/v2/servers/{resourceId}".to_string())
        );
        assert_eq!(
            profile.endpoint(EndpointKind::Delete).unwrap().method,
            Method::Delete
        );
        assert!(profile.usage().unwrap().allows(crate::classify::PayloadKind::Create, "name"));
    }

    #[test]
    fn test_missing_endpoint_and_usage_are_config_errors() {
        let component = Component::new("c1", "Hetzner::Cloud::Server");
        let profile = ResourceProfile::resolve(&component, ResourceMeta::default()).unwrap();

        let err = profile.endpoint(EndpointKind::Create).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Malformed resource metadata: no create endpoint declared for Hetzner::Cloud::Server"
        );
        assert!(profile.usage().unwrap_err().is_config_error());
    }

    #[test]
    fn test_malformed_usage_map_names_component() {
        let component = Component::new("vpc-7", "AWS::EC2::VPC")
            .with_domain(json!({"extra": {"propUsageMap": {"createOnly": "CidrBlock"}}}));
        let err = ResourceProfile::resolve(&component, ResourceMeta::default()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("malformed propUsageMap on vpc-7"), "{message}");
        assert!(message.contains("createOnly"), "{message}");
    }

    #[test]
    fn test_envelope_and_id_field() {
        let component = Component::new("c", "Hetzner::Cloud::Server").with_domain(json!({
            "extra": {"envelope": "server", "idField": "/id"}
        }));
        let profile = ResourceProfile::resolve(&component, ResourceMeta::default()).unwrap();
        let body = json!({"server": {"id": 42, "name": "web-1"}, "action": {"id": 1}});

        let inner = profile.unwrap_envelope(body);
        assert_eq!(inner, json!({"id": 42, "name": "web-1"}));
        assert_eq!(profile.id_of(&inner), Some("42".to_string()));
    }
}
