//! Component and secrets files

use anyhow::{Context, Result, anyhow};
use driftflow_cloud::{Component, MemorySecretStore};
use std::collections::HashMap;
use std::path::Path;

/// Read a component from JSON, or YAML when the extension says so
pub fn load_component(path: &Path) -> Result<Component> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read component file {}", path.display()))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let component = if is_yaml {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid component YAML in {}", path.display()))?
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid component JSON in {}", path.display()))?
    };
    Ok(component)
}

/// Read a JSON object of secret key to value; no file means no secrets
pub fn load_secrets(path: Option<&Path>) -> Result<MemorySecretStore> {
    let Some(path) = path else {
        return Ok(MemorySecretStore::new());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read secrets file {}", path.display()))?;
    // serde messages quote offending values; report the position only
    let secrets: HashMap<String, String> = serde_json::from_str(&content).map_err(|e| {
        anyhow!(
            "Secrets file {} must be a JSON object of strings (line {}, column {})",
            path.display(),
            e.line(),
            e.column()
        )
    })?;
    tracing::debug!(count = secrets.len(), "Loaded secrets");
    Ok(secrets.into_iter().collect())
}
