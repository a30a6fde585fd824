//! aws CLI wrapper
//!
//! Runs `aws <args> --output json` and hands back stdout as JSON.

use crate::error::{AwsError, Result};
use async_trait::async_trait;
use driftflow_cloud::{ProviderRequest, ProviderResponse, Target, Transport};
use serde_json::Value;
use std::process::Stdio;
use tokio::process::Command;

/// stderr markers of the addressed resource being missing. Service codes such as
/// `InvalidSubnetID.NotFound` name some other resource and stay failures.
const NOT_FOUND_MARKERS: &[&str] = &["ResourceNotFoundException", "HandlerErrorCode: NotFound"];

/// aws CLI wrapper
#[derive(Debug, Clone)]
pub struct AwsCli {
    program: String,
    profile: Option<String>,
}

impl Default for AwsCli {
    fn default() -> Self {
        Self::new("aws")
    }
}

impl AwsCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            profile: None,
        }
    }

    /// Pass `--profile` on every call
    pub fn with_profile(mut self, profile: Option<String>) -> Self {
        self.profile = profile.filter(|p| !p.is_empty());
        self
    }

    /// Run an aws command and parse stdout
    pub async fn run(&self, args: &[String]) -> Result<Value> {
        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        if let Some(profile) = &self.profile {
            cmd.arg("--profile").arg(profile);
        }
        cmd.arg("--output").arg("json");
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        // Arguments past the subcommand may carry desired state
        tracing::debug!(
            "Running: {} {}",
            self.program,
            args.iter().take(2).cloned().collect::<Vec<_>>().join(" ")
        );

        let output = cmd.output().await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AwsError::CliNotFound(self.program.clone()),
            _ => AwsError::IoError(e),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if NOT_FOUND_MARKERS.iter().any(|m| stderr.contains(m)) {
                return Err(AwsError::ResourceNotFound(stderr));
            }
            return Err(AwsError::CommandFailed {
                code: output.status.code().unwrap_or(-1),
                stderr,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&stdout)?)
    }
}

#[async_trait]
impl Transport for AwsCli {
    async fn send(&self, request: &ProviderRequest) -> driftflow_cloud::Result<ProviderResponse> {
        let Target::Args(args) = &request.target else {
            return Err(AwsError::UnsupportedTarget(request.target.to_string()).into());
        };
        let body = self.run(args).await?;
        Ok(ProviderResponse::ok(body))
    }
}
