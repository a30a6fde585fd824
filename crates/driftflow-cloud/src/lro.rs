//! Long-running operation polling
//!
//! Mutating calls on several providers return an operation handle instead
//! of the finished resource. The poller is provider-agnostic: an
//! [`LroProtocol`] says where to poll and how to read a status body, the
//! poller drives `Polling → Done | Failed | TimedOut` on the same backoff
//! schedule as retries.
//!
//! Which protocol applies is declared per resource type ([`LroStyle`]),
//! never guessed from the response shape.

use crate::error::{CloudError, Result};
use crate::provider::ProviderResponse;
use crate::retry::{RetryConfig, sleep_or_cancel};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Operation completion shape declared by resource metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LroStyle {
    /// Responses are final
    #[default]
    None,
    /// Google Cloud `Operation` resources (`status: DONE`, `selfLink`)
    GoogleOperation,
    /// Azure `Azure-AsyncOperation` / `Location` status monitors
    AzureAsync,
    /// AWS Cloud Control `ProgressEvent` request tokens
    CloudControl,
    /// Hetzner Cloud `action` objects
    HetznerAction,
    /// DigitalOcean `action` objects
    DigitalOceanAction,
}

impl LroStyle {
    pub fn protocol(self) -> Option<Box<dyn LroProtocol>> {
        match self {
            LroStyle::None => None,
            LroStyle::GoogleOperation => Some(Box::new(GoogleOperation)),
            LroStyle::AzureAsync => Some(Box::new(AzureAsyncOperation)),
            LroStyle::CloudControl => Some(Box::new(CloudControlRequest)),
            LroStyle::HetznerAction => Some(Box::new(HetznerAction)),
            LroStyle::DigitalOceanAction => Some(Box::new(DigitalOceanAction)),
        }
    }
}

/// Where to poll an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollHandle {
    /// Absolute status URL handed out by the provider
    Url(String),
    /// Values to render the resource type's `poll` endpoint with
    Bindings(BTreeMap<String, String>),
}

impl PollHandle {
    fn binding(name: &str, value: impl Into<String>) -> Self {
        PollHandle::Bindings(BTreeMap::from([(name.to_string(), value.into())]))
    }
}

/// Provider-specific reading of operation status responses
pub trait LroProtocol: Send + Sync {
    /// Operation handle carried by a mutating response, `None` if the call finished synchronously
    fn poll_handle(&self, response: &ProviderResponse) -> Option<PollHandle>;

    fn is_complete(&self, status: &ProviderResponse) -> bool;

    fn is_error(&self, status: &ProviderResponse) -> bool;

    /// The provider's own error detail, preserved verbatim
    fn error_detail(&self, body: &Value) -> String;

    /// Error for a failed operation
    fn failure(&self, body: &Value) -> CloudError {
        CloudError::OperationFailed(self.error_detail(body))
    }

    /// Final result of a completed operation; may still reject an error embedded in a done body
    fn extract(&self, body: &Value) -> Result<Value> {
        Ok(body.clone())
    }

    /// Provider resource id reported by a finished operation
    fn resource_id(&self, _body: &Value) -> Option<String> {
        None
    }
}

/// Poll loop state
#[derive(Debug)]
pub enum PollState {
    Polling { attempt: u32, delay: Duration },
    Done(Value),
    Failed(CloudError),
    TimedOut,
}

/// Drives an operation to a terminal state
pub struct LroPoller<'a> {
    protocol: &'a dyn LroProtocol,
    config: &'a RetryConfig,
    cancel: &'a CancellationToken,
}

impl<'a> LroPoller<'a> {
    pub fn new(
        protocol: &'a dyn LroProtocol,
        config: &'a RetryConfig,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            protocol,
            config,
            cancel,
        }
    }

    /// Terminal state for a status response, or `None` while the operation is still running.
    pub fn evaluate(&self, status: &ProviderResponse) -> Option<PollState> {
        if self.protocol.is_complete(status) {
            return Some(match self.protocol.extract(&status.body) {
                Ok(result) => PollState::Done(result),
                Err(e) => PollState::Failed(e),
            });
        }
        if self.protocol.is_error(status) {
            return Some(PollState::Failed(self.protocol.failure(&status.body)));
        }
        None
    }

    /// Poll with `tick` (one status GET) until the operation terminates.
    pub async fn poll<F, Fut>(&self, mut tick: F) -> Result<Value>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<ProviderResponse>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut state = PollState::Polling {
            attempt: 1,
            delay: Duration::ZERO,
        };

        loop {
            state = match state {
                PollState::Polling { attempt, .. } => {
                    let status = tick().await?;
                    match self.evaluate(&status) {
                        Some(terminal) => terminal,
                        None if attempt >= max_attempts => PollState::TimedOut,
                        None => {
                            let delay = self.config.delay_for_attempt(attempt);
                            tracing::debug!(
                                attempt,
                                delay_ms = delay.as_millis() as u64,
                                "Operation still running"
                            );
                            sleep_or_cancel(self.cancel, delay).await?;
                            PollState::Polling {
                                attempt: attempt + 1,
                                delay,
                            }
                        }
                    }
                }
                PollState::Done(result) => return Ok(result),
                PollState::Failed(error) => return Err(error),
                PollState::TimedOut => {
                    return Err(CloudError::Timeout(format!(
                        "operation did not complete after {max_attempts} polls"
                    )));
                }
            };
        }
    }
}

fn str_at<'v>(body: &'v Value, pointer: &str) -> Option<&'v str> {
    body.pointer(pointer).and_then(Value::as_str)
}

fn id_at(body: &Value, pointer: &str) -> Option<String> {
    body.pointer(pointer)
        .and_then(crate::value::scalar_string)
}

fn present(body: &Value, pointer: &str) -> bool {
    body.pointer(pointer).is_some_and(|v| !v.is_null())
}

/// Google Cloud `compute#operation` and friends
pub struct GoogleOperation;

impl LroProtocol for GoogleOperation {
    fn poll_handle(&self, response: &ProviderResponse) -> Option<PollHandle> {
        str_at(&response.body, "/selfLink").map(|url| PollHandle::Url(url.to_string()))
    }

    fn is_complete(&self, status: &ProviderResponse) -> bool {
        let body = &status.body;
        str_at(body, "/status") == Some("DONE") || body.get("done") == Some(&Value::Bool(true))
    }

    fn is_error(&self, status: &ProviderResponse) -> bool {
        present(&status.body, "/error")
    }

    fn error_detail(&self, body: &Value) -> String {
        body.get("error").map(Value::to_string).unwrap_or_default()
    }

    fn extract(&self, body: &Value) -> Result<Value> {
        if present(body, "/error") {
            return Err(CloudError::OperationFailed(self.error_detail(body)));
        }
        Ok(body.clone())
    }

    fn resource_id(&self, body: &Value) -> Option<String> {
        str_at(body, "/targetLink")
            .and_then(|link| link.rsplit('/').next())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
    }
}

/// Azure Resource Manager asynchronous operations
pub struct AzureAsyncOperation;

impl LroProtocol for AzureAsyncOperation {
    fn poll_handle(&self, response: &ProviderResponse) -> Option<PollHandle> {
        response
            .header("azure-asyncoperation")
            .or_else(|| response.header("location"))
            .map(|url| PollHandle::Url(url.to_string()))
    }

    fn is_complete(&self, status: &ProviderResponse) -> bool {
        match str_at(&status.body, "/status") {
            Some(state) => state.eq_ignore_ascii_case("succeeded"),
            // Location monitors answer 202 until done, then 200 with the resource or 204
            None => status.status != 202,
        }
    }

    fn is_error(&self, status: &ProviderResponse) -> bool {
        str_at(&status.body, "/status").is_some_and(|s| {
            s.eq_ignore_ascii_case("failed") || s.eq_ignore_ascii_case("canceled")
        })
    }

    fn error_detail(&self, body: &Value) -> String {
        match body.get("error") {
            Some(error) if !error.is_null() => error.to_string(),
            _ => str_at(body, "/status").unwrap_or("Failed").to_string(),
        }
    }
}

/// AWS Cloud Control `get-resource-request-status`
pub struct CloudControlRequest;

impl LroProtocol for CloudControlRequest {
    fn poll_handle(&self, response: &ProviderResponse) -> Option<PollHandle> {
        str_at(&response.body, "/ProgressEvent/RequestToken")
            .map(|token| PollHandle::binding("requestToken", token))
    }

    fn is_complete(&self, status: &ProviderResponse) -> bool {
        str_at(&status.body, "/ProgressEvent/OperationStatus") == Some("SUCCESS")
    }

    fn is_error(&self, status: &ProviderResponse) -> bool {
        matches!(
            str_at(&status.body, "/ProgressEvent/OperationStatus"),
            Some("FAILED") | Some("CANCEL_COMPLETE")
        )
    }

    fn error_detail(&self, body: &Value) -> String {
        let code = str_at(body, "/ProgressEvent/ErrorCode");
        let message = str_at(body, "/ProgressEvent/StatusMessage").unwrap_or("operation failed");
        match code {
            Some(code) => format!("{code}: {message}"),
            None => message.to_string(),
        }
    }

    /// `HandlerErrorCode` NotFound means the target resource is gone
    fn failure(&self, body: &Value) -> CloudError {
        let detail = self.error_detail(body);
        match str_at(body, "/ProgressEvent/ErrorCode") {
            Some("NotFound") => CloudError::ResourceNotFound(detail),
            _ => CloudError::OperationFailed(detail),
        }
    }

    fn resource_id(&self, body: &Value) -> Option<String> {
        id_at(body, "/ProgressEvent/Identifier")
    }
}

/// Hetzner Cloud actions
pub struct HetznerAction;

impl LroProtocol for HetznerAction {
    fn poll_handle(&self, response: &ProviderResponse) -> Option<PollHandle> {
        id_at(&response.body, "/action/id").map(|id| PollHandle::binding("actionId", id))
    }

    fn is_complete(&self, status: &ProviderResponse) -> bool {
        str_at(&status.body, "/action/status") == Some("success")
    }

    fn is_error(&self, status: &ProviderResponse) -> bool {
        str_at(&status.body, "/action/status") == Some("error")
    }

    fn error_detail(&self, body: &Value) -> String {
        body.pointer("/action/error")
            .map(Value::to_string)
            .unwrap_or_else(|| "action failed".to_string())
    }
}

/// DigitalOcean actions
pub struct DigitalOceanAction;

impl LroProtocol for DigitalOceanAction {
    fn poll_handle(&self, response: &ProviderResponse) -> Option<PollHandle> {
        id_at(&response.body, "/links/actions/0/id")
            .or_else(|| id_at(&response.body, "/action/id"))
            .map(|id| PollHandle::binding("actionId", id))
    }

    fn is_complete(&self, status: &ProviderResponse) -> bool {
        str_at(&status.body, "/action/status") == Some("completed")
    }

    fn is_error(&self, status: &ProviderResponse) -> bool {
        str_at(&status.body, "/action/status") == Some("errored")
    }

    fn error_detail(&self, body: &Value) -> String {
        body.get("action")
            .map(Value::to_string)
            .unwrap_or_else(|| "action errored".to_string())
    }
}
