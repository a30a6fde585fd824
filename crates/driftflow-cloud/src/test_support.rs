//! Scripted in-memory provider for executor and discovery tests

use crate::error::{CloudError, Result};
use crate::metadata::ResourceMeta;
use crate::provider::{ProviderAdapter, ProviderRequest, ProviderResponse};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;
use tokio::time::Instant;

/// Answers requests from scripted responses and records what it was sent
///
/// Routed responses (keyed by the rendered target) are consumed before the
/// shared queue.
pub struct ScriptedAdapter {
    name: String,
    context: BTreeMap<String, String>,
    defaults: ResourceMeta,
    routes: Mutex<HashMap<String, VecDeque<Result<ProviderResponse>>>>,
    queue: Mutex<VecDeque<Result<ProviderResponse>>>,
    sent: Mutex<Vec<(ProviderRequest, Instant)>>,
}

impl ScriptedAdapter {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            context: BTreeMap::new(),
            defaults: ResourceMeta::default(),
            routes: Mutex::new(HashMap::new()),
            queue: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn new() -> Self {
        Self::named("scripted")
    }

    pub fn with_context(mut self, key: &str, value: &str) -> Self {
        self.context.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_defaults(mut self, defaults: ResourceMeta) -> Self {
        self.defaults = defaults;
        self
    }

    /// Queue a response for the next unrouted request
    pub fn then(self, response: Result<ProviderResponse>) -> Self {
        self.queue.lock().unwrap().push_back(response);
        self
    }

    pub fn then_ok(self, body: Value) -> Self {
        self.then(Ok(ProviderResponse::ok(body)))
    }

    pub fn then_status(self, status: u16) -> Self {
        let error = match status {
            404 => CloudError::ResourceNotFound("scripted".to_string()),
            _ => CloudError::api(Some(status), format!("scripted HTTP {status}")),
        };
        self.then(Err(error))
    }

    /// Answer requests for `target` (as rendered by `Display`)
    pub fn route(self, target: &str, response: Result<ProviderResponse>) -> Self {
        self.routes
            .lock()
            .unwrap()
            .entry(target.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub fn route_ok(self, target: &str, body: Value) -> Self {
        self.route(target, Ok(ProviderResponse::ok(body)))
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(request, _)| request.clone())
            .collect()
    }

    pub fn request_times(&self) -> Vec<Instant> {
        self.sent.lock().unwrap().iter().map(|(_, at)| *at).collect()
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn context(&self) -> &BTreeMap<String, String> {
        &self.context
    }

    fn defaults(&self, _kind: &str) -> ResourceMeta {
        self.defaults.clone()
    }

    async fn send(&self, request: &ProviderRequest) -> Result<ProviderResponse> {
        self.sent
            .lock()
            .unwrap()
            .push((request.clone(), Instant::now()));

        let key = request.target.to_string();
        let routed = self
            .routes
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(VecDeque::pop_front);
        if let Some(response) = routed {
            return response;
        }

        self.queue.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(CloudError::api(
                Some(500),
                format!("no scripted response for {} {}", request.method, key),
            ))
        })
    }
}
