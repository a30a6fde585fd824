//! Provider registry and per-provider executor tuning

use driftflow_cloud::{ExecutorConfig, ProviderRegistry, RetryConfig};
use driftflow_config::{Backoff, Settings};

/// Registry with every built-in provider
pub fn registry() -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    driftflow_cloud_aws::register(&mut registry);
    driftflow_cloud_http::register(&mut registry);
    registry
}

/// Executor tuning for `kind`: provider defaults, then the settings file
pub fn executor_config(settings: &Settings, kind: &str) -> ExecutorConfig {
    let mut config = ExecutorConfig::default();
    if kind.starts_with(driftflow_cloud_aws::PREFIX) {
        config.retry = driftflow_cloud_aws::retry_config();
    }
    if let Some(backoff) = &settings.retry {
        apply(&mut config.retry, backoff);
    }
    if let Some(backoff) = &settings.poll {
        apply(&mut config.poll, backoff);
    }
    config.timeout = settings.timeout();
    config
}

fn apply(retry: &mut RetryConfig, backoff: &Backoff) {
    if let Some(max_attempts) = backoff.max_attempts {
        retry.max_attempts = max_attempts;
    }
    if let Some(delay) = backoff.base_delay() {
        retry.initial_delay = delay;
    }
    if let Some(delay) = backoff.max_delay() {
        retry.max_delay = delay;
    }
}
