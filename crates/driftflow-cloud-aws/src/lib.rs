//! DriftFlow AWS Provider
//!
//! Drives every `AWS::*` resource type through the AWS Cloud Control API by
//! shelling out to the `aws` CLI, which resolves credentials, region
//! defaults and SSO sessions on its own.
//!
//! ```text
//! Executor ──▶ AwsAdapter ──▶ AwsCli ──▶ aws cloudcontrol <command> --output json
//! ```

pub mod cli;
pub mod error;
pub mod provider;

// Re-exports
pub use cli::AwsCli;
pub use error::{AwsError, Result};
pub use provider::{AwsAdapter, defaults, retry_config};

/// Resource-type prefix served by this crate
pub const PREFIX: &str = "AWS::";

/// Register the Cloud Control adapter.
pub fn register(registry: &mut driftflow_cloud::ProviderRegistry) {
    registry.register(PREFIX, |credentials: &dyn driftflow_cloud::CredentialResolver| {
        let adapter: std::sync::Arc<dyn driftflow_cloud::ProviderAdapter> =
            std::sync::Arc::new(AwsAdapter::from_credentials(credentials)?);
        Ok(adapter)
    });
}
