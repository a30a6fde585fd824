//! HTTP provider error types

use driftflow_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HttpError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("HTTP transport cannot send CLI arguments: {0}")]
    UnsupportedTarget(String),

    #[error("Cloud error: {0}")]
    Cloud(#[from] CloudError),
}

impl From<HttpError> for CloudError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Cloud(e) => e,
            HttpError::Request(e) => {
                let status = e.status().map(|s| s.as_u16());
                CloudError::api(status, e.to_string())
            }
            HttpError::InvalidUrl(e) => CloudError::InvalidConfig(format!("invalid URL: {e}")),
            HttpError::UnsupportedTarget(msg) => CloudError::InvalidConfig(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, HttpError>;
