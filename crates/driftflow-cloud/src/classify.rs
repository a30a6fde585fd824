//! Property classification
//!
//! A resource type's [`PropertyUsageMap`] partitions its properties into
//! create-only, updatable and secret-backed sets. Classification restricts a
//! desired-state tree to the keys allowed for a create or an update.

use crate::error::{CloudError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Which payload is being built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Create,
    Update,
}

/// A secret-backed property: `secret_key` in the secret store fills `prop_path`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretBinding {
    pub secret_key: String,
    pub prop_path: Vec<String>,
}

impl SecretBinding {
    pub fn new<I, S>(secret_key: impl Into<String>, prop_path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            secret_key: secret_key.into(),
            prop_path: prop_path.into_iter().map(Into::into).collect(),
        }
    }
}

/// Per resource-type property classification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyUsageMap {
    pub create_only: BTreeSet<String>,
    pub updatable: BTreeSet<String>,
    pub secrets: Vec<SecretBinding>,
}

impl PropertyUsageMap {
    pub fn new<I, J, S, T>(create_only: I, updatable: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            create_only: create_only.into_iter().map(Into::into).collect(),
            updatable: updatable.into_iter().map(Into::into).collect(),
            secrets: Vec::new(),
        }
    }

    pub fn with_secret(mut self, binding: SecretBinding) -> Self {
        self.secrets.push(binding);
        self
    }

    /// Parse a usage map from resource metadata.
    ///
    /// Accepts an object or a JSON-encoded string. Missing fields are empty;
    /// fields of the wrong shape are rejected with the field name.
    pub fn from_value(value: &Value) -> Result<Self> {
        let parsed;
        let value = match value {
            Value::String(raw) => {
                parsed = serde_json::from_str::<Value>(raw).map_err(|e| {
                    CloudError::MalformedMetadata(format!("propUsageMap is not valid JSON: {e}"))
                })?;
                &parsed
            }
            other => other,
        };

        let map = value.as_object().ok_or_else(|| {
            CloudError::MalformedMetadata("propUsageMap must be an object".to_string())
        })?;

        let create_only = string_list(map, "createOnly")?;
        let updatable = string_list(map, "updatable")?;

        if let Some(both) = create_only.intersection(&updatable).next() {
            return Err(CloudError::MalformedMetadata(format!(
                "propUsageMap lists {both} as both createOnly and updatable"
            )));
        }

        let secrets = match map.get("secrets") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    serde_json::from_value::<SecretBinding>(item.clone()).map_err(|e| {
                        CloudError::MalformedMetadata(format!(
                            "propUsageMap.secrets[{i}] is malformed: {e}"
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            Some(_) => {
                return Err(CloudError::MalformedMetadata(
                    "propUsageMap.secrets must be a list".to_string(),
                ));
            }
        };

        Ok(Self {
            create_only,
            updatable,
            secrets,
        })
    }

    /// Whether a top-level key may be sent for `kind`
    pub fn allows(&self, kind: PayloadKind, key: &str) -> bool {
        match kind {
            PayloadKind::Create => self.create_only.contains(key) || self.updatable.contains(key),
            PayloadKind::Update => self.updatable.contains(key),
        }
    }

    /// Restrict `tree` to allowed top-level keys. Kept keys keep their whole sub-tree.
    pub fn classify(&self, kind: PayloadKind, tree: &Value) -> Value {
        let kept: Map<String, Value> = match tree {
            Value::Object(map) => map
                .iter()
                .filter(|(key, _)| self.allows(kind, key))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            _ => Map::new(),
        };
        Value::Object(kept)
    }
}

fn string_list(map: &Map<String, Value>, field: &str) -> Result<BTreeSet<String>> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(BTreeSet::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    CloudError::MalformedMetadata(format!(
                        "propUsageMap.{field} must contain only strings"
                    ))
                })
            })
            .collect(),
        Some(_) => Err(CloudError::MalformedMetadata(format!(
            "propUsageMap.{field} must be a list"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vpc_usage() -> PropertyUsageMap {
        PropertyUsageMap::new(["CidrBlock"], ["Tags"])
    }

    #[test]
    fn test_classify_create_and_update() {
        let domain = json!({
            "CidrBlock": "10.0.0.0/16",
            "Tags": [{"Key": "Name", "Value": "x"}],
            "Extra": "drop-me"
        });

        assert_eq!(
            vpc_usage().classify(PayloadKind::Create, &domain),
            json!({"CidrBlock": "10.0.0.0/16", "Tags": [{"Key": "Name", "Value": "x"}]})
        );
        assert_eq!(
            vpc_usage().classify(PayloadKind::Update, &domain),
            json!({"Tags": [{"Key": "Name", "Value": "x"}]})
        );
    }

    #[test]
    fn test_descendants_are_kept_unconditionally() {
        let usage = PropertyUsageMap::new(Vec::<String>::new(), ["Config"]);
        let domain = json!({"Config": {"CidrBlock": "x", "Nested": {"Deep": 1}}});
        assert_eq!(usage.classify(PayloadKind::Update, &domain), domain);
    }

    #[test]
    fn test_from_value_object_and_string() {
        let object = json!({
            "createOnly": ["CidrBlock"],
            "updatable": ["Tags"],
            "secrets": [{"secretKey": "db", "propPath": ["MasterUserPassword"]}]
        });
        let from_object = PropertyUsageMap::from_value(&object).unwrap();
        let from_string = PropertyUsageMap::from_value(&json!(object.to_string())).unwrap();

        assert_eq!(from_object, from_string);
        assert!(from_object.create_only.contains("CidrBlock"));
        assert_eq!(
            from_object.secrets,
            vec![SecretBinding::new("db", ["MasterUserPassword"])]
        );
    }

    #[test]
    fn test_malformed_maps_fail_fast() {
        let err = PropertyUsageMap::from_value(&json!({"createOnly": "CidrBlock"})).unwrap_err();
        assert!(matches!(err, CloudError::MalformedMetadata(_)));
        assert!(err.to_string().contains("createOnly must be a list"));

        let err = PropertyUsageMap::from_value(&json!({"secrets": {"a": 1}})).unwrap_err();
        assert!(err.to_string().contains("secrets must be a list"));

        let err =
            PropertyUsageMap::from_value(&json!({"createOnly": ["A"], "updatable": ["A"]}))
                .unwrap_err();
        assert!(err.to_string().contains("both createOnly and updatable"));

        assert!(PropertyUsageMap::from_value(&json!("{not json")).is_err());
    }
}
