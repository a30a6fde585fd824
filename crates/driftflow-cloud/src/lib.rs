//! DriftFlow Cloud Resource Pipeline
//!
//! This crate reconciles declarative components against cloud provider
//! APIs: create, refresh, update, delete, import and discover, with
//! secret injection, rate-limit backoff, long-running operation polling,
//! pagination and schema-shape normalization.
//!
//! # Supported Providers
//!
//! Providers live in adapter crates and plug in through [`ProviderAdapter`]:
//!
//! - **AWS**: Cloud Control API (via `aws` CLI) in `driftflow-cloud-aws`
//! - **Google Cloud, Azure, DigitalOcean, Hetzner, Microsoft Graph**:
//!   REST over HTTPS in `driftflow-cloud-http`
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  DriftFlow CLI                   │
//! │               (drift run / batch)                │
//! └─────────────────┬───────────────────────────────┘
//!                   │ execute(op, component)
//! ┌─────────────────▼───────────────────────────────┐
//! │                driftflow-cloud                   │
//! │  ┌──────────────┐  ┌──────────────────────────┐ │
//! │  │   Executor   │──│ Discovery / Import       │ │
//! │  └──────┬───────┘  └──────────────────────────┘ │
//! │  ┌──────▼───────┐  ┌──────────┐  ┌───────────┐  │
//! │  │ PayloadBuilder│ │  Retry   │  │ LroPoller │  │
//! │  │ classify      │ │ backoff  │  │           │  │
//! │  │ secrets/prune │ └──────────┘  └───────────┘  │
//! │  └───────────────┘  ParamSource   SchemaHints   │
//! └───────┬─────────────────┬───────────────────────┘
//!         │ trait ProviderAdapter
//! ┌───────▼───────┐ ┌───────▼───────┐
//! │  cloud-http   │ │   cloud-aws   │
//! │   (reqwest)   │ │  (aws CLI)    │
//! └───────────────┘ └───────────────┘
//! ```

pub mod action;
pub mod classify;
pub mod component;
pub mod credentials;
pub mod discovery;
pub mod error;
pub mod executor;
pub mod lro;
pub mod metadata;
pub mod params;
pub mod payload;
pub mod provider;
pub mod registry;
pub mod retry;
pub mod schema;
pub mod secrets;
pub mod value;

#[cfg(test)]
mod test_support;

// Re-exports
pub use action::{ActionResult, ActionSet, NewComponent, Operation, Ops, ResultStatus};
pub use classify::{PayloadKind, PropertyUsageMap, SecretBinding};
pub use component::{Component, ResourceSnapshot, SiProps};
pub use credentials::{CredentialResolver, EnvCredentials, StaticCredentials};
pub use discovery::RefinementFilter;
pub use error::{CloudError, Result};
pub use executor::{Executor, ExecutorConfig};
pub use lro::{LroPoller, LroProtocol, LroStyle, PollHandle, PollState};
pub use metadata::{
    EndpointKind, Endpoints, PageMode, Pagination, ResourceMeta, ResourceProfile, UpdateStyle,
};
pub use params::{Endpoint, Method, Target, Template};
pub use payload::PayloadBuilder;
pub use provider::{ProviderAdapter, ProviderRequest, ProviderResponse, Transport};
pub use registry::{AdapterFactory, ProviderRegistry};
pub use retry::RetryConfig;
pub use schema::{Discriminator, SchemaHints, Variant};
pub use secrets::{MemorySecretStore, SecretStore};
