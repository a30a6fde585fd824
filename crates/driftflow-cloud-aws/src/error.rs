//! AWS provider error types

use driftflow_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AwsError {
    #[error("aws CLI not found ({0}). Please install: https://aws.amazon.com/cli/")]
    CliNotFound(String),

    #[error("aws CLI exited with code {code}: {stderr}")]
    CommandFailed { code: i32, stderr: String },

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("aws CLI takes argument lists, not {0}")]
    UnsupportedTarget(String),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Cloud error: {0}")]
    CloudError(#[from] CloudError),
}

impl From<AwsError> for CloudError {
    fn from(err: AwsError) -> Self {
        match err {
            AwsError::CloudError(e) => e,
            AwsError::ResourceNotFound(msg) => CloudError::ResourceNotFound(msg),
            // Keep stderr in the message; throttling is only visible there
            e @ AwsError::CommandFailed { .. } => CloudError::api(None, e.to_string()),
            AwsError::CliNotFound(msg) => CloudError::CommandFailed(msg),
            AwsError::UnsupportedTarget(msg) => CloudError::InvalidConfig(msg),
            AwsError::JsonError(e) => CloudError::Json(e),
            AwsError::IoError(e) => CloudError::Io(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, AwsError>;
