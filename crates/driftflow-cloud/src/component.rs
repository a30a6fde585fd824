//! Component records supplied by the component store
//!
//! The store owns components; executors only read them and return deltas.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Sub-tree of `domain` holding provider metadata rather than desired state
pub const EXTRA_KEY: &str = "extra";

/// A declared infrastructure resource instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Stable identifier assigned by the store
    pub id: String,

    /// Resource-type tag (e.g. "AWS::EC2::VPC")
    pub kind: String,

    /// Desired-state tree; provider metadata lives under `domain.extra`
    #[serde(default)]
    pub domain: Value,

    /// Last-observed provider state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceSnapshot>,

    #[serde(default)]
    pub si: SiProps,

    /// Attribute subscriptions declared on the component
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
}

/// System-level properties
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiProps {
    /// Provider-assigned identity, empty until created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

/// Last-observed state of the upstream resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Component {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            domain: Value::Object(Map::new()),
            ..Default::default()
        }
    }

    pub fn with_domain(mut self, domain: Value) -> Self {
        self.domain = domain;
        self
    }

    pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.si.resource_id = Some(resource_id.into());
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.resource = Some(ResourceSnapshot {
            status: Some("ok".to_string()),
            payload: Some(payload),
        });
        self
    }

    /// Provider metadata under `domain.extra`
    pub fn extra(&self) -> Option<&Map<String, Value>> {
        self.domain.get(EXTRA_KEY).and_then(Value::as_object)
    }

    /// Provider resource id, ignoring empty strings
    pub fn resource_id(&self) -> Option<&str> {
        self.si.resource_id.as_deref().filter(|id| !id.is_empty())
    }

    /// Observed payload, ignoring null
    pub fn payload(&self) -> Option<&Value> {
        self.resource
            .as_ref()
            .and_then(|r| r.payload.as_ref())
            .filter(|p| !p.is_null())
    }

    /// Desired state without the `extra` sub-tree
    pub fn desired(&self) -> Value {
        match &self.domain {
            Value::Object(map) => Value::Object(
                map.iter()
                    .filter(|(k, _)| k.as_str() != EXTRA_KEY)
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            ),
            _ => Value::Object(Map::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_store_record() {
        let component: Component = serde_json::from_value(json!({
            "id": "01J",
            "kind": "AWS::EC2::VPC",
            "domain": {"CidrBlock": "10.0.0.0/16", "extra": {"region": "us-east-1"}},
            "resource": {"status": "ok", "payload": {"VpcId": "vpc-1"}},
            "si": {"resourceId": "vpc-1"}
        }))
        .unwrap();

        assert_eq!(component.resource_id(), Some("vpc-1"));
        assert_eq!(component.payload(), Some(&json!({"VpcId": "vpc-1"})));
        assert_eq!(component.desired(), json!({"CidrBlock": "10.0.0.0/16"}));
        assert_eq!(
            component.extra().and_then(|e| e.get("region")),
            Some(&json!("us-east-1"))
        );
    }

    #[test]
    fn test_empty_identity_and_null_payload_are_absent() {
        let component: Component = serde_json::from_value(json!({
            "id": "c",
            "kind": "k",
            "resource": {"payload": null},
            "si": {"resourceId": ""}
        }))
        .unwrap();

        assert_eq!(component.resource_id(), None);
        assert_eq!(component.payload(), None);
    }
}
