//! Action executor
//!
//! Runs one [`Operation`] for one [`Component`] against a provider adapter
//! and reports the outcome as an [`ActionResult`]. Failures never cross the
//! executor boundary as `Err`: callers match on `status`.

use crate::action::{ActionResult, ActionSet, Operation, Ops, SelfUpdate, UpdateOps, SELF_KEY};
use crate::classify::PayloadKind;
use crate::component::Component;
use crate::discovery;
use crate::error::{CloudError, Result};
use crate::lro::{LroPoller, PollHandle};
use crate::metadata::{EndpointKind, ResourceProfile, UpdateStyle};
use crate::params::{
    self, PAYLOAD_PARAM, ParamSource, RESOURCE_ID_PARAM, RESOURCE_TYPE_PARAM, Target,
};
use crate::payload::PayloadBuilder;
use crate::provider::{ProviderAdapter, ProviderRequest, ProviderResponse};
use crate::retry::RetryConfig;
use crate::schema;
use crate::secrets::{self, SecretStore};
use crate::value;
use futures_util::stream::{self, StreamExt};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Executor tuning
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorConfig {
    /// Backoff for rate-limited provider calls
    pub retry: RetryConfig,

    /// Backoff and attempt budget for operation polling
    pub poll: RetryConfig,

    /// Deadline for a whole operation
    pub timeout: Option<Duration>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            poll: RetryConfig {
                max_attempts: 60,
                initial_delay: Duration::from_secs(2),
                max_delay: Duration::from_secs(30),
                ..RetryConfig::default()
            },
            timeout: None,
        }
    }
}

/// Outcome of waiting on a mutating call
struct Settled {
    body: Value,
    resource_id: Option<String>,
}

/// Executes resource operations for one provider
pub struct Executor {
    adapter: Arc<dyn ProviderAdapter>,
    secrets: Arc<dyn SecretStore>,
    config: ExecutorConfig,
    cancel: CancellationToken,
}

impl Executor {
    pub fn new(adapter: Arc<dyn ProviderAdapter>, secrets: Arc<dyn SecretStore>) -> Self {
        Self {
            adapter,
            secrets,
            config: ExecutorConfig::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a caller-owned cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn adapter(&self) -> &Arc<dyn ProviderAdapter> {
        &self.adapter
    }

    /// Run `op` for `component`.
    pub async fn execute(&self, op: Operation, component: &Component) -> ActionResult {
        tracing::info!(
            operation = %op,
            component = %component.id,
            kind = %component.kind,
            provider = self.adapter.name(),
            "Executing operation"
        );

        let outcome = match self.config.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.dispatch(op, component)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(CloudError::Timeout(format!(
                    "{} on {} did not finish within {}s",
                    op,
                    component.id,
                    limit.as_secs()
                ))),
            },
            None => self.dispatch(op, component).await,
        };

        match outcome {
            Ok(result) => {
                tracing::info!(operation = %op, component = %component.id, "Operation succeeded");
                result
            }
            Err(e) => {
                tracing::warn!(operation = %op, component = %component.id, "Operation failed: {}", e);
                ActionResult::error(e.to_string())
            }
        }
    }

    /// Run `op` for every component with at most `concurrency` in flight.
    /// Results are in input order.
    pub async fn execute_many(
        &self,
        op: Operation,
        components: &[Component],
        concurrency: usize,
    ) -> Vec<ActionResult> {
        stream::iter(components)
            .map(|component| self.execute(op, component))
            .buffered(concurrency.max(1))
            .collect()
            .await
    }

    async fn dispatch(&self, op: Operation, component: &Component) -> Result<ActionResult> {
        let profile = ResourceProfile::resolve(component, self.adapter.defaults(&component.kind))?;
        match op {
            Operation::Create => self.create(&profile, component).await,
            Operation::Refresh => self.refresh(&profile, component).await,
            Operation::Update => self.update(&profile, component).await,
            Operation::Delete => self.delete(&profile, component).await,
            Operation::Import => self.import(&profile, component).await,
            Operation::Discover => discovery::discover(self, &profile, component).await,
        }
    }

    async fn create(&self, profile: &ResourceProfile, component: &Component) -> Result<ActionResult> {
        if component.payload().is_some() {
            return Err(CloudError::ResourceAlreadyExists(format!(
                "{} already has a resource; refresh or delete it first",
                component.id
            )));
        }

        let payload = self.build_payload(profile, PayloadKind::Create, component)?;
        let source = self
            .source(profile, component)
            .bind(PAYLOAD_PARAM, serde_json::to_string(&payload)?);
        let request = self
            .request(profile, EndpointKind::Create, &source)?
            .with_body(payload.clone());

        let response = self.call(request).await?;
        let settled = self.settle(profile, &response, component).await?;

        // A settled status body may carry the operation's own id
        let resource_id = settled
            .as_ref()
            .and_then(|s| s.resource_id.clone())
            .or_else(|| profile.id_of(&response.body))
            .or_else(|| settled.as_ref().and_then(|s| profile.id_of(&s.body)))
            .or_else(|| profile.id_of(&payload))
            .or_else(|| component.resource_id().map(str::to_string));

        let mut result = ActionResult::ok();
        match resource_id {
            Some(id) => result = result.with_resource_id(id),
            None => tracing::warn!(component = %component.id, "Provider did not report a resource id"),
        }

        // After an operation the response describes the operation, not the resource
        if settled.is_none() && !value::is_empty(&response.body) {
            result = result.with_payload(self.observed(profile, response.body)?);
        }
        Ok(result)
    }

    async fn refresh(&self, profile: &ResourceProfile, component: &Component) -> Result<ActionResult> {
        let id = component
            .resource_id()
            .ok_or_else(|| CloudError::MissingParameter(RESOURCE_ID_PARAM.to_string()))?;
        let request = self.request(profile, EndpointKind::Get, &self.source(profile, component))?;

        match self.call(request).await {
            Ok(response) => Ok(ActionResult::ok()
                .with_resource_id(id)
                .with_payload(self.observed(profile, response.body)?)),
            Err(e) if e.is_not_found() => {
                tracing::info!(component = %component.id, resource_id = id, "Resource no longer exists upstream");
                Ok(ActionResult::absent())
            }
            Err(e) => Err(e),
        }
    }

    async fn update(&self, profile: &ResourceProfile, component: &Component) -> Result<ActionResult> {
        let current = component.payload().ok_or_else(|| {
            CloudError::ResourceNotFound(format!(
                "{} has no resource to update; create or import it first",
                component.id
            ))
        })?;

        let payload = self.build_payload(profile, PayloadKind::Update, component)?;
        let body = match profile.update_style {
            UpdateStyle::Put => {
                let mut merged = schema::transform_out(current, &profile.schema);
                value::merge(&mut merged, &payload);
                merged
            }
            UpdateStyle::Patch => payload,
            UpdateStyle::JsonPatch => {
                let request = self.request(profile, EndpointKind::Get, &self.source(profile, component))?;
                let live = self
                    .adapter
                    .read_payload(profile, self.call(request).await?.body)?;
                let mut merged = live.clone();
                value::merge(&mut merged, &payload);

                let patch = value::patch_between(&live, &merged);
                if patch.0.is_empty() {
                    return Ok(ActionResult::ok().with_message("No changes"));
                }
                serde_json::to_value(&patch)?
            }
        };

        let source = self
            .source(profile, component)
            .bind(PAYLOAD_PARAM, serde_json::to_string(&body)?);
        let request = self
            .request(profile, EndpointKind::Update, &source)?
            .with_body(body);
        let response = self.call(request).await?;
        self.settle(profile, &response, component).await?;

        let mut result = ActionResult::ok();
        if let Some(id) = component.resource_id() {
            result = result.with_resource_id(id);
        }
        Ok(result)
    }

    async fn delete(&self, profile: &ResourceProfile, component: &Component) -> Result<ActionResult> {
        let request = self.request(profile, EndpointKind::Delete, &self.source(profile, component))?;

        let outcome = match self.call(request).await {
            Ok(response) => self.settle(profile, &response, component).await.map(|_| ()),
            Err(e) => Err(e),
        };
        match outcome {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::info!(component = %component.id, "Resource already gone");
            }
            Err(e) => return Err(e),
        }
        Ok(ActionResult::absent())
    }

    async fn import(&self, profile: &ResourceProfile, component: &Component) -> Result<ActionResult> {
        let id = component
            .resource_id()
            .ok_or_else(|| CloudError::MissingParameter(RESOURCE_ID_PARAM.to_string()))?;
        let request = self.request(profile, EndpointKind::Get, &self.source(profile, component))?;
        let payload = self.observed(profile, self.call(request).await?.body)?;

        let mut domain = component.domain.clone();
        value::merge(&mut domain, &discovery::domain_of(profile, &payload));

        let mut properties = json!({
            "si": { "resourceId": id },
            "domain": domain,
        });
        let actions = if component.resource.is_none() {
            properties["resource"] = json!({ "status": "ok", "payload": payload });
            ActionSet::default().remove(Operation::Create)
        } else {
            ActionSet::default()
                .add(Operation::Refresh)
                .remove(Operation::Create)
        };

        let mut ops = Ops::new();
        ops.update = Some(UpdateOps {
            self_: SelfUpdate { properties },
        });
        ops.actions.insert(SELF_KEY.to_string(), actions);

        Ok(ActionResult::ok()
            .with_resource_id(id)
            .with_message(format!("Imported {id}"))
            .with_ops(ops))
    }

    /// Placeholder values for `component`, with `{resourceType}` bound to the resolved type.
    pub(crate) fn source<'a>(
        &'a self,
        profile: &ResourceProfile,
        component: &'a Component,
    ) -> ParamSource<'a> {
        ParamSource::new(component, self.adapter.context())
            .bind(RESOURCE_TYPE_PARAM, profile.resource_type.clone())
    }

    pub(crate) fn request(
        &self,
        profile: &ResourceProfile,
        kind: EndpointKind,
        source: &ParamSource<'_>,
    ) -> Result<ProviderRequest> {
        let endpoint = profile.endpoint(kind)?;
        let target = params::resolve(endpoint, source)?;
        Ok(ProviderRequest::new(endpoint.method, target).with_base_url(profile.base_url.clone()))
    }

    /// Send a request under the retry engine.
    pub(crate) async fn call(&self, request: ProviderRequest) -> Result<ProviderResponse> {
        tracing::debug!(
            provider = self.adapter.name(),
            method = %request.method,
            target = %request.target.summary(),
            "Provider request"
        );
        let adapter = &self.adapter;
        let request = &request;
        self.config
            .retry
            .run(&self.cancel, |e| adapter.is_rate_limited(e), move || adapter.send(request))
            .await
    }

    /// Normalize a resource body into observed state.
    pub(crate) fn observed(&self, profile: &ResourceProfile, body: Value) -> Result<Value> {
        let payload = self.adapter.read_payload(profile, body)?;
        let mut shaped = schema::transform_in(&payload, &profile.schema);
        if let Ok(usage) = profile.usage() {
            secrets::redact_secrets(&mut shaped, &usage.secrets)?;
        }
        Ok(shaped)
    }

    fn build_payload(
        &self,
        profile: &ResourceProfile,
        kind: PayloadKind,
        component: &Component,
    ) -> Result<Value> {
        let payload = PayloadBuilder::new(profile.usage()?, self.secrets.as_ref())
            .build(kind, &component.desired())?;
        Ok(schema::transform_out(&payload, &profile.schema))
    }

    /// Wait for the operation a mutating response started, if any.
    async fn settle(
        &self,
        profile: &ResourceProfile,
        response: &ProviderResponse,
        component: &Component,
    ) -> Result<Option<Settled>> {
        let Some(protocol) = self.adapter.lro_protocol(profile.lro_style) else {
            return Ok(None);
        };
        let Some(handle) = protocol.poll_handle(response) else {
            return Ok(None);
        };

        let poll_request = match handle {
            PollHandle::Url(url) => ProviderRequest::get(Target::Url(url)),
            PollHandle::Bindings(bindings) => {
                let source = bindings
                    .into_iter()
                    .fold(self.source(profile, component), |source, (k, v)| source.bind(k, v));
                self.request(profile, EndpointKind::Poll, &source)?
            }
        };
        tracing::info!(
            component = %component.id,
            style = ?profile.lro_style,
            "Waiting for provider operation"
        );

        let this = self;
        let poll_request = &poll_request;
        let body = LroPoller::new(protocol.as_ref(), &self.config.poll, &self.cancel)
            .poll(move || {
                let request = poll_request.clone();
                async move { this.call(request).await }
            })
            .await?;

        Ok(Some(Settled {
            resource_id: protocol.resource_id(&body),
            body,
        }))
    }
}
