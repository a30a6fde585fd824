//! DriftFlow REST Providers
//!
//! Bearer-token REST adapters for [`driftflow_cloud`]:
//!
//! | Prefix              | Provider          | Token variable          |
//! |---------------------|-------------------|-------------------------|
//! | `Google.`           | Google Cloud      | `GOOGLE_ACCESS_TOKEN`   |
//! | `Microsoft.`        | Azure ARM         | `AZURE_ACCESS_TOKEN`    |
//! | `Microsoft.Graph/`  | Microsoft Graph   | `MSGRAPH_ACCESS_TOKEN`  |
//! | `DigitalOcean::`    | DigitalOcean      | `DIGITALOCEAN_TOKEN`    |
//! | `Hetzner::`         | Hetzner Cloud     | `HCLOUD_TOKEN`          |
//!
//! ```text
//! ProviderRegistry ──resolve(kind)──▶ RestAdapter(RestProfile)
//!                                        │ defaults / rate limits
//!                                        ▼
//!                                   HttpTransport (reqwest)
//! ```

pub mod adapter;
pub mod azure;
pub mod digitalocean;
pub mod error;
pub mod google;
pub mod graph;
pub mod hetzner;
pub mod transport;

// Re-exports
pub use adapter::{RestAdapter, RestProfile};
pub use error::{HttpError, Result};
pub use transport::HttpTransport;

use driftflow_cloud::{CredentialResolver, ProviderAdapter, ProviderRegistry};
use std::sync::Arc;

pub type Build = fn(&dyn CredentialResolver) -> driftflow_cloud::Result<RestAdapter>;

/// Resource-type prefixes served by this crate
pub const PROVIDERS: &[(&str, Build)] = &[
    ("Google.", google::adapter),
    ("Microsoft.", azure::adapter),
    ("Microsoft.Graph/", graph::adapter),
    ("DigitalOcean::", digitalocean::adapter),
    ("Hetzner::", hetzner::adapter),
];

/// Register every REST provider.
pub fn register(registry: &mut ProviderRegistry) {
    for &(prefix, build) in PROVIDERS {
        registry.register(prefix, move |credentials: &dyn CredentialResolver| {
            let adapter: Arc<dyn ProviderAdapter> = Arc::new(build(credentials)?);
            Ok(adapter)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftflow_cloud::{CloudError, StaticCredentials};

    #[test]
    fn test_graph_wins_over_azure() {
        let mut registry = ProviderRegistry::new();
        register(&mut registry);
        let creds = StaticCredentials::new()
            .with(azure::TOKEN_VAR, "arm")
            .with(graph::TOKEN_VAR, "graph");

        let adapter = registry.resolve("Microsoft.Graph/groups", &creds).unwrap();
        assert_eq!(adapter.name(), "msgraph");
        let adapter = registry
            .resolve("Microsoft.Network/virtualNetworks", &creds)
            .unwrap();
        assert_eq!(adapter.name(), "azure");
    }

    #[test]
    fn test_unknown_prefix_and_missing_token() {
        let mut registry = ProviderRegistry::new();
        register(&mut registry);
        let creds = StaticCredentials::new();

        let err = registry.resolve("Oracle::Compute", &creds).err().unwrap();
        assert!(matches!(err, CloudError::ProviderNotFound(_)));
        let err = registry.resolve("Hetzner::Cloud::Server", &creds).err().unwrap();
        assert!(matches!(err, CloudError::MissingCredential(ref v) if v == hetzner::TOKEN_VAR));
    }
}
