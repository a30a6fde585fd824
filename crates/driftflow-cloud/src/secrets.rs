//! Secret injection and redaction
//!
//! Secret values are resolved from a [`SecretStore`] only while a request
//! payload is being built. They are never written into desired state, and
//! payloads handed back to the store are redacted at the same paths.
//!
//! ## Security
//!
//! - Resolved values are never logged; only secret keys are
//! - Error messages never contain secret values

use crate::classify::SecretBinding;
use crate::error::{CloudError, Result};
use crate::value;
use serde_json::Value;
use std::collections::HashMap;

/// Read-only secret lookup supplied by the caller
pub trait SecretStore: Send + Sync {
    /// Resolve a secret, `None` when absent or intentionally unset
    fn get(&self, key: &str) -> Option<String>;
}

/// In-memory secret store
#[derive(Debug, Clone, Default)]
pub struct MemorySecretStore {
    values: HashMap<String, String>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }
}

impl SecretStore for MemorySecretStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).filter(|v| !v.is_empty()).cloned()
    }
}

impl<K, V> FromIterator<(K, V)> for MemorySecretStore
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn check_binding(binding: &SecretBinding) -> Result<()> {
    if binding.prop_path.is_empty() {
        return Err(CloudError::MalformedMetadata(format!(
            "secret {} has an empty propPath",
            binding.secret_key
        )));
    }
    Ok(())
}

/// Write resolved secrets into `payload`, returning how many were injected.
///
/// Absent secrets are skipped. An empty `prop_path` is a configuration error.
pub fn inject_secrets(
    payload: &mut Value,
    bindings: &[SecretBinding],
    store: &dyn SecretStore,
) -> Result<usize> {
    let mut injected = 0;
    for binding in bindings {
        check_binding(binding)?;

        let Some(secret) = store.get(&binding.secret_key) else {
            tracing::debug!(secret_key = %binding.secret_key, "Secret not set, skipping");
            continue;
        };

        value::set_path(payload, &binding.prop_path, Value::String(secret));
        injected += 1;
        tracing::debug!(secret_key = %binding.secret_key, "Injected secret");
    }
    Ok(injected)
}

/// Remove every secret-backed path from `payload`.
pub fn redact_secrets(payload: &mut Value, bindings: &[SecretBinding]) -> Result<()> {
    for binding in bindings {
        check_binding(binding)?;
        value::remove_path(payload, &binding.prop_path);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_inject_creates_nested_path() {
        let store = MemorySecretStore::new().with("db-password", "hunter2");
        let bindings = vec![SecretBinding::new(
            "db-password",
            ["MasterUserSecret", "Password"],
        )];
        let mut payload = json!({"Engine": "postgres"});

        let count = inject_secrets(&mut payload, &bindings, &store).unwrap();

        assert_eq!(count, 1);
        assert_eq!(
            payload,
            json!({"Engine": "postgres", "MasterUserSecret": {"Password": "hunter2"}})
        );
    }

    #[test]
    fn test_absent_secret_is_skipped() {
        let store = MemorySecretStore::new().with("blank", "");
        let bindings = vec![
            SecretBinding::new("missing", ["Password"]),
            SecretBinding::new("blank", ["Token"]),
        ];
        let mut payload = json!({"Engine": "postgres"});

        assert_eq!(inject_secrets(&mut payload, &bindings, &store).unwrap(), 0);
        assert_eq!(payload, json!({"Engine": "postgres"}));
    }

    #[test]
    fn test_empty_prop_path_fails_fast() {
        let store = MemorySecretStore::new().with("k", "v");
        let bindings = vec![SecretBinding::new("k", Vec::<String>::new())];
        let err = inject_secrets(&mut json!({}), &bindings, &store).unwrap_err();
        assert!(matches!(err, CloudError::MalformedMetadata(_)));
        assert!(err.to_string().contains("empty propPath"));
    }

    #[test]
    fn test_redact_removes_leaves() {
        let bindings = vec![SecretBinding::new("k", ["Auth", "Password"])];
        let mut payload = json!({"Auth": {"Password": "x", "User": "admin"}});
        redact_secrets(&mut payload, &bindings).unwrap();
        assert_eq!(payload, json!({"Auth": {"User": "admin"}}));
    }
}
