//! Provider credentials
//!
//! Adapters receive a [`CredentialResolver`] at construction and resolve
//! every credential they need up front, so a missing one fails before any
//! network call.

use crate::error::{CloudError, Result};
use std::collections::HashMap;

/// Credential lookup by name (e.g. `HCLOUD_TOKEN`)
pub trait CredentialResolver: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;

    /// Resolve a credential that must be present and non-empty
    fn require(&self, name: &str) -> Result<String> {
        self.get(name)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| CloudError::MissingCredential(name.to_string()))
    }
}

/// Reads credentials from process environment variables
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentials;

impl CredentialResolver for EnvCredentials {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Fixed credential table
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    values: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

impl CredentialResolver for StaticCredentials {
    fn get(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }
}
