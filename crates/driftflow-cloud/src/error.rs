//! Cloud provider error types

use thiserror::Error;

/// Errors produced while executing resource actions
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Provider not found for resource type: {0}")]
    ProviderNotFound(String),

    #[error("Missing credential: {0} is not set")]
    MissingCredential(String),

    #[error("Malformed resource metadata: {0}")]
    MalformedMetadata(String),

    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Resource already exists: {0}")]
    ResourceAlreadyExists(String),

    #[error("API error: {message}")]
    ApiError {
        /// HTTP status when the provider speaks HTTP
        status: Option<u16>,
        message: String,
    },

    #[error("Provider operation failed: {0}")]
    OperationFailed(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    pub fn api(status: Option<u16>, message: impl Into<String>) -> Self {
        CloudError::ApiError {
            status,
            message: message.into(),
        }
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            CloudError::ApiError { status, .. } => *status,
            CloudError::ResourceNotFound(_) => Some(404),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CloudError::ResourceNotFound(_))
    }

    /// Configuration errors are raised before any network call and never retried.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            CloudError::ProviderNotFound(_)
                | CloudError::MissingCredential(_)
                | CloudError::MalformedMetadata(_)
                | CloudError::MissingParameter(_)
                | CloudError::InvalidConfig(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_and_classification() {
        assert_eq!(CloudError::api(Some(429), "slow down").status(), Some(429));
        assert_eq!(CloudError::ResourceNotFound("x".into()).status(), Some(404));
        assert!(CloudError::MissingParameter("project".into()).is_config_error());
        assert!(!CloudError::api(None, "boom").is_config_error());
    }

    #[test]
    fn test_messages_name_the_culprit() {
        let err = CloudError::MissingCredential("HCLOUD_TOKEN".into());
        assert_eq!(err.to_string(), "Missing credential: HCLOUD_TOKEN is not set");

        let err = CloudError::MissingParameter("zone".into());
        assert!(err.to_string().contains("zone"));
    }
}
