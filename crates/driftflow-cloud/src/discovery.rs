//! Bulk discovery of existing upstream resources
//!
//! A discovery template is a component whose non-empty desired-state
//! fields act as a filter. Every listed resource matching the filter comes
//! back as a `create` op for the store, with the default `create` action
//! removed since the resource already exists upstream.

use crate::action::{ActionResult, ActionSet, NewComponent, Operation, Ops};
use crate::classify::PayloadKind;
use crate::component::{Component, EXTRA_KEY};
use crate::error::{CloudError, Result};
use crate::executor::Executor;
use crate::metadata::{EndpointKind, PageMode, ResourceProfile};
use crate::params::{self, RESOURCE_ID_PARAM, Target};
use crate::provider::ProviderRequest;
use crate::value;
use serde_json::{Map, Value, json};
use std::collections::HashSet;

/// Non-empty desired-state fields of a discovery template
#[derive(Debug, Clone, PartialEq)]
pub struct RefinementFilter(Value);

impl RefinementFilter {
    pub fn from_component(template: &Component) -> Self {
        match value::prune(&template.desired()) {
            Value::Null => Self(Value::Object(Map::new())),
            fields => Self(fields),
        }
    }

    pub fn is_empty(&self) -> bool {
        value::is_empty(&self.0)
    }

    /// Whether a discovered resource satisfies every filter field
    pub fn matches(&self, observed: &Value) -> bool {
        self.is_empty() || value::is_superset(observed, &self.0)
    }
}

/// Declarative domain of an observed resource: the properties a user may set
pub(crate) fn domain_of(profile: &ResourceProfile, observed: &Value) -> Value {
    let kept = match profile.usage() {
        Ok(usage) => usage.classify(PayloadKind::Create, observed),
        Err(_) => observed.clone(),
    };
    match value::prune(&kept) {
        Value::Null => Value::Object(Map::new()),
        domain => domain,
    }
}

pub(crate) async fn discover(
    executor: &Executor,
    profile: &ResourceProfile,
    template: &Component,
) -> Result<ActionResult> {
    let filter = RefinementFilter::from_component(template);
    let summaries = list_all(executor, profile, template).await?;
    tracing::info!(
        kind = %template.kind,
        listed = summaries.len(),
        filtered = !filter.is_empty(),
        "Listed upstream resources"
    );

    let id_pointer = profile
        .pagination
        .id
        .as_deref()
        .or(profile.id_field.as_deref());

    let mut ops = Ops::new();
    for summary in &summaries {
        let Some(resource_id) = id_pointer
            .and_then(|pointer| summary.pointer(pointer))
            .and_then(value::scalar_string)
        else {
            tracing::warn!(kind = %template.kind, "Listed resource has no id, skipping");
            continue;
        };

        let observed = match fetch(executor, profile, template, &resource_id).await {
            Ok(observed) => observed,
            Err(e) => {
                tracing::warn!(resource_id = %resource_id, "Skipping resource that could not be read: {}", e);
                continue;
            }
        };

        let mut domain = domain_of(profile, &observed);
        if !filter.matches(&domain) {
            tracing::debug!(resource_id = %resource_id, "Resource does not match refinement filter");
            continue;
        }

        if let (Some(extra), Value::Object(map)) = (template.extra(), &mut domain) {
            map.insert(EXTRA_KEY.to_string(), Value::Object(extra.clone()));
        }

        ops.create.insert(
            resource_id.clone(),
            NewComponent {
                kind: template.kind.clone(),
                properties: json!({
                    "si": { "resourceId": resource_id },
                    "domain": domain,
                    "resource": { "status": "ok", "payload": observed },
                }),
                attributes: template.attributes.clone(),
            },
        );
        ops.actions
            .insert(resource_id, ActionSet::default().remove(Operation::Create));
    }

    let count = ops.create.len();
    tracing::info!(kind = %template.kind, count, "Discovery finished");
    Ok(ActionResult::ok()
        .with_message(format!("Discovered {count} resources"))
        .with_ops(ops))
}

/// Page through the list endpoint, collecting summary records.
async fn list_all(
    executor: &Executor,
    profile: &ResourceProfile,
    template: &Component,
) -> Result<Vec<Value>> {
    let endpoint = profile.endpoint(EndpointKind::List)?;
    let first = params::resolve(endpoint, &executor.source(profile, template))?;
    let pagination = &profile.pagination;

    let mut target = first.clone();
    let mut items = Vec::new();
    let mut seen = HashSet::new();

    loop {
        let request = ProviderRequest::new(endpoint.method, target)
            .with_base_url(profile.base_url.clone());
        let body = executor.call(request).await?.body;

        let page = if pagination.items.is_empty() {
            Some(&body)
        } else {
            body.pointer(&pagination.items)
        };
        match page {
            Some(Value::Array(list)) => items.extend(list.iter().cloned()),
            None | Some(Value::Null) => {}
            Some(_) => {
                return Err(CloudError::api(
                    None,
                    format!("list response has no item array at '{}'", pagination.items),
                ));
            }
        }

        let next = pagination
            .next
            .as_deref()
            .and_then(|pointer| body.pointer(pointer))
            .and_then(value::scalar_string);
        let Some(next) = next else {
            break;
        };
        if !seen.insert(next.clone()) {
            tracing::warn!(next = %next, "Provider repeated a page token, stopping pagination");
            break;
        }

        target = match &pagination.mode {
            PageMode::Token { param } => {
                let mut target = first.clone();
                target.push_param(param, &next);
                target
            }
            PageMode::Link => Target::Url(next),
        };
    }

    Ok(items)
}

async fn fetch(
    executor: &Executor,
    profile: &ResourceProfile,
    template: &Component,
    resource_id: &str,
) -> Result<Value> {
    let source = executor.source(profile, template).bind(RESOURCE_ID_PARAM, resource_id);
    let request = executor.request(profile, EndpointKind::Get, &source)?;
    let response = executor.call(request).await?;
    executor.observed(profile, response.body)
}
