//! Settings file schema
//!
//! ```yaml
//! retry:
//!   max_attempts: 20
//!   base_delay_ms: 1000
//!   max_delay_ms: 90000
//! poll:
//!   max_attempts: 60
//! concurrency: 4
//! secrets_file: secrets.json
//! timeout_secs: 1800
//! ```

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONCURRENCY: usize = 4;

/// Backoff overrides; unset fields keep the built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Backoff {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_delay_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delay_ms: Option<u64>,
}

impl Backoff {
    pub fn base_delay(&self) -> Option<Duration> {
        self.base_delay_ms.map(Duration::from_millis)
    }

    pub fn max_delay(&self) -> Option<Duration> {
        self.max_delay_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Rate-limit backoff for provider calls
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<Backoff>,

    /// Long-running operation polling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll: Option<Backoff>,

    /// Components executed in parallel by `drift batch`
    pub concurrency: usize,

    /// JSON map of secret key to value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secrets_file: Option<PathBuf>,

    /// Deadline for a single operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            retry: None,
            poll: None,
            concurrency: DEFAULT_CONCURRENCY,
            secrets_file: None,
            timeout_secs: None,
        }
    }
}

impl Settings {
    /// Parse a settings file; relative paths inside it resolve against its directory.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut settings = Self::parse(&content).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;

        if let (Some(secrets), Some(dir)) = (&settings.secrets_file, path.parent()) {
            if secrets.is_relative() {
                settings.secrets_file = Some(dir.join(secrets));
            }
        }
        Ok(settings)
    }

    pub fn parse(content: &str) -> Result<Self> {
        // An empty document is a valid, all-default settings file
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Settings =
            serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
                path: PathBuf::new(),
                source,
            })?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid {
                field: "concurrency",
                reason: "must be at least 1".to_string(),
            });
        }
        for (field, backoff) in [("retry", &self.retry), ("poll", &self.poll)] {
            let Some(backoff) = backoff else { continue };
            if backoff.max_attempts == Some(0) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "max_attempts must be at least 1".to_string(),
                });
            }
            if let (Some(base), Some(max)) = (backoff.base_delay_ms, backoff.max_delay_ms) {
                if base > max {
                    return Err(ConfigError::Invalid {
                        field,
                        reason: format!("base_delay_ms {base} exceeds max_delay_ms {max}"),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
