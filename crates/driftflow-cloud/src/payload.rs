//! Wire payload construction
//!
//! classify → strip secret paths → inject secrets → prune empty values.

use crate::classify::{PayloadKind, PropertyUsageMap};
use crate::error::Result;
use crate::secrets::{self, SecretStore};
use crate::value;
use serde_json::{Map, Value};

/// Builds minimal request payloads for one resource type
pub struct PayloadBuilder<'a> {
    usage: &'a PropertyUsageMap,
    secrets: &'a dyn SecretStore,
}

impl<'a> PayloadBuilder<'a> {
    pub fn new(usage: &'a PropertyUsageMap, secrets: &'a dyn SecretStore) -> Self {
        Self { usage, secrets }
    }

    /// Build the payload for `kind` from a desired-state tree (without `extra`).
    ///
    /// Literal values sitting at secret paths in the desired state are never
    /// sent; only values resolved from the secret store are.
    pub fn build(&self, kind: PayloadKind, desired: &Value) -> Result<Value> {
        let mut payload = self.usage.classify(kind, desired);
        secrets::redact_secrets(&mut payload, &self.usage.secrets)?;

        let bindings: Vec<_> = self
            .usage
            .secrets
            .iter()
            .filter(|b| {
                b.prop_path
                    .first()
                    .is_some_and(|top| self.usage.allows(kind, top))
            })
            .cloned()
            .collect();
        secrets::inject_secrets(&mut payload, &bindings, self.secrets)?;

        Ok(match value::prune(&payload) {
            Value::Null => Value::Object(Map::new()),
            pruned => pruned,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::SecretBinding;
    use crate::secrets::MemorySecretStore;
    use serde_json::json;

    #[test]
    fn test_vpc_create_payload() {
        let usage = PropertyUsageMap::new(["CidrBlock"], ["Tags"]);
        let store = MemorySecretStore::new();
        let domain = json!({
            "CidrBlock": "10.0.0.0/16",
            "Tags": [{"Key": "Name", "Value": "x"}],
            "Extra": "drop-me"
        });

        let payload = PayloadBuilder::new(&usage, &store)
            .build(PayloadKind::Create, &domain)
            .unwrap();

        assert_eq!(
            payload,
            json!({"CidrBlock": "10.0.0.0/16", "Tags": [{"Key": "Name", "Value": "x"}]})
        );
    }

    #[test]
    fn test_secret_literals_never_leak() {
        let usage = PropertyUsageMap::new(["Engine", "MasterUserPassword"], Vec::<String>::new())
            .with_secret(SecretBinding::new("db", ["MasterUserPassword"]));
        let domain = json!({"Engine": "postgres", "MasterUserPassword": "literal-in-domain"});

        let without = PayloadBuilder::new(&usage, &MemorySecretStore::new())
            .build(PayloadKind::Create, &domain)
            .unwrap();
        assert_eq!(without, json!({"Engine": "postgres"}));

        let store = MemorySecretStore::new().with("db", "from-store");
        let with = PayloadBuilder::new(&usage, &store)
            .build(PayloadKind::Create, &domain)
            .unwrap();
        assert_eq!(
            with,
            json!({"Engine": "postgres", "MasterUserPassword": "from-store"})
        );
    }

    #[test]
    fn test_update_skips_create_only_secrets() {
        let usage = PropertyUsageMap::new(["Password"], ["Size"])
            .with_secret(SecretBinding::new("pw", ["Password"]));
        let store = MemorySecretStore::new().with("pw", "x");

        let payload = PayloadBuilder::new(&usage, &store)
            .build(PayloadKind::Update, &json!({"Size": 2, "Password": "y"}))
            .unwrap();

        assert_eq!(payload, json!({"Size": 2}));
    }

    #[test]
    fn test_payload_is_deterministic() {
        let usage = PropertyUsageMap::new(["A", "B"], ["C"]);
        let store = MemorySecretStore::new();
        let domain = json!({"C": {"z": 1, "a": [1, 2]}, "A": "", "B": {"x": null, "y": 2}});
        let builder = PayloadBuilder::new(&usage, &store);

        let first = serde_json::to_string(&builder.build(PayloadKind::Create, &domain).unwrap())
            .unwrap();
        let second = serde_json::to_string(&builder.build(PayloadKind::Create, &domain).unwrap())
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(
            builder.build(PayloadKind::Create, &domain).unwrap(),
            json!({"B": {"y": 2}, "C": {"z": 1, "a": [1, 2]}})
        );
    }
}
