//! `drift run` / `drift batch`

use crate::inputs;
use crate::providers;
use anyhow::Result;
use driftflow_cloud::{
    ActionResult, Component, CredentialResolver, Executor, Operation, ProviderRegistry,
    SecretStore,
};
use driftflow_config::Settings;
use futures_util::stream::{self, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Everything an operation needs besides the component
pub struct Context {
    pub registry: ProviderRegistry,
    pub settings: Settings,
    pub secrets: Arc<dyn SecretStore>,
    pub credentials: Box<dyn CredentialResolver>,
    pub cancel: CancellationToken,
}

impl Context {
    /// Run `op` against `component`; provider lookup failures become error results.
    pub async fn execute(&self, op: Operation, component: &Component) -> ActionResult {
        let adapter = match self
            .registry
            .resolve(&component.kind, self.credentials.as_ref())
        {
            Ok(adapter) => adapter,
            Err(e) => {
                tracing::error!(component = %component.id, kind = %component.kind, "{}", e);
                return ActionResult::error(e.to_string());
            }
        };

        Executor::new(adapter, Arc::clone(&self.secrets))
            .with_config(providers::executor_config(&self.settings, &component.kind))
            .with_cancellation(self.cancel.clone())
            .execute(op, component)
            .await
    }
}

pub async fn run(ctx: &Context, op: Operation, path: PathBuf) -> Result<ActionResult> {
    let component = inputs::load_component(&path)?;
    Ok(ctx.execute(op, &component).await)
}

/// Results come back in file order.
pub async fn batch(
    ctx: &Context,
    op: Operation,
    paths: &[PathBuf],
    concurrency: usize,
) -> Result<Vec<ActionResult>> {
    // Every file must parse before anything touches a provider
    let components = paths
        .iter()
        .map(|path| inputs::load_component(path))
        .collect::<Result<Vec<_>>>()?;

    tracing::info!(count = components.len(), concurrency, %op, "Running batch");
    let results: Vec<ActionResult> = stream::iter(components.iter())
        .map(|component| ctx.execute(op, component))
        .buffered(concurrency.max(1))
        .collect()
        .await;
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftflow_cloud::{MemorySecretStore, ResultStatus, StaticCredentials};
    use std::fs;

    fn context() -> Context {
        Context {
            registry: providers::registry(),
            settings: Settings::default(),
            secrets: Arc::new(MemorySecretStore::new()),
            credentials: Box::new(StaticCredentials::new()),
            cancel: CancellationToken::new(),
        }
    }

    #[tokio::test]
    async fn test_unknown_provider_is_an_error_result() {
        let component = Component::new("db", "Oracle::Database::Instance");
        let result = context().execute(Operation::Refresh, &component).await;

        assert_eq!(result.status, ResultStatus::Error);
        assert_eq!(
            result.message.as_deref(),
            Some("Provider not found for resource type: Oracle::Database::Instance")
        );
    }

    #[tokio::test]
    async fn test_batch_keeps_file_order() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut paths = Vec::new();
        for (name, kind) in [
            ("a.json", "Hetzner::Cloud::Server"),
            ("b.json", "Oracle::Compute"),
            ("c.json", "DigitalOcean::Droplet"),
        ] {
            let path = temp_dir.path().join(name);
            fs::write(&path, format!(r#"{{"id": "{name}", "kind": "{kind}"}}"#)).unwrap();
            paths.push(path);
        }

        let results = batch(&context(), Operation::Refresh, &paths, 2).await.unwrap();

        let messages: Vec<String> = results.into_iter().filter_map(|r| r.message).collect();
        assert_eq!(messages.len(), 3);
        assert!(messages[0].contains("HCLOUD_TOKEN"));
        assert!(messages[1].contains("Oracle::Compute"));
        assert!(messages[2].contains("DIGITALOCEAN_TOKEN"));
    }

    #[tokio::test]
    async fn test_batch_rejects_unreadable_files_up_front() {
        let paths = vec![PathBuf::from("/nonexistent/component.json")];
        let err = batch(&context(), Operation::Create, &paths, 1).await.unwrap_err();
        assert!(err.to_string().contains("/nonexistent/component.json"));
    }
}
