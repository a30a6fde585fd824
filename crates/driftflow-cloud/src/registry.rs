//! Resource-type tag → provider adapter lookup

use crate::credentials::CredentialResolver;
use crate::error::{CloudError, Result};
use crate::provider::ProviderAdapter;
use std::sync::Arc;

/// Builds an adapter from credentials; fails when a required credential is missing
pub type AdapterFactory =
    Box<dyn Fn(&dyn CredentialResolver) -> Result<Arc<dyn ProviderAdapter>> + Send + Sync>;

/// Maps resource-type prefixes (`AWS::`, `Google.`, `Microsoft.Graph/`, ...) to adapters
///
/// The longest matching prefix wins, so `Microsoft.Graph/` can coexist
/// with the broader `Microsoft.`.
#[derive(Default)]
pub struct ProviderRegistry {
    entries: Vec<(String, AdapterFactory)>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, prefix: impl Into<String>, factory: F)
    where
        F: Fn(&dyn CredentialResolver) -> Result<Arc<dyn ProviderAdapter>> + Send + Sync + 'static,
    {
        self.entries.push((prefix.into(), Box::new(factory)));
    }

    pub fn with<F>(mut self, prefix: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&dyn CredentialResolver) -> Result<Arc<dyn ProviderAdapter>> + Send + Sync + 'static,
    {
        self.register(prefix, factory);
        self
    }

    /// Registered prefixes, in registration order
    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(prefix, _)| prefix.as_str())
    }

    fn factory_for(&self, kind: &str) -> Option<&AdapterFactory> {
        self.entries
            .iter()
            .filter(|(prefix, _)| kind.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, factory)| factory)
    }

    /// Build the adapter responsible for `kind`.
    pub fn resolve(
        &self,
        kind: &str,
        credentials: &dyn CredentialResolver,
    ) -> Result<Arc<dyn ProviderAdapter>> {
        let factory = self
            .factory_for(kind)
            .ok_or_else(|| CloudError::ProviderNotFound(kind.to_string()))?;
        factory(credentials)
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("prefixes", &self.prefixes().collect::<Vec<_>>())
            .finish()
    }
}
