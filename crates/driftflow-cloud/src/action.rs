//! Operation kinds and the normalized result handed back to the component store

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Key under `ops.actions` / `ops.update` addressing the component being executed.
pub const SELF_KEY: &str = "self";

/// Kind of action to perform against a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Create the upstream resource
    Create,
    /// Read the upstream resource back into `resource.payload`
    Refresh,
    /// Push updatable properties to an existing resource
    Update,
    /// Delete the upstream resource
    Delete,
    /// Adopt a single existing resource by its provider id
    Import,
    /// List upstream resources and emit components for them
    Discover,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::Create,
        Operation::Refresh,
        Operation::Update,
        Operation::Delete,
        Operation::Import,
        Operation::Discover,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Refresh => "refresh",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Import => "import",
            Operation::Discover => "discover",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| format!("unknown operation: {s}"))
    }
}

/// Status of an action result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Ok,
    Error,
}

/// Result of a single operation invocation
///
/// `payload: Some(Value::Null)` is meaningful: it tells the store the
/// upstream resource is gone and the component's resource record should be
/// cleared. `None` means "no payload reported".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub status: ResultStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ops: Option<Ops>,
}

impl ActionResult {
    pub fn ok() -> Self {
        Self {
            status: ResultStatus::Ok,
            payload: None,
            resource_id: None,
            message: None,
            ops: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::Error,
            message: Some(message.into()),
            ..Self::ok()
        }
    }

    /// Successful result reporting that the upstream resource no longer exists
    pub fn absent() -> Self {
        Self::ok().with_payload(Value::Null)
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_ops(mut self, ops: Ops) -> Self {
        self.ops = Some(ops);
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == ResultStatus::Ok
    }
}

/// Graph mutations the store should apply after an operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ops {
    /// New components keyed by provider resource id
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub create: BTreeMap<String, NewComponent>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<UpdateOps>,

    /// Pending-action mutations keyed by [`SELF_KEY`] or a new component's resource id
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub actions: BTreeMap<String, ActionSet>,
}

impl Ops {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.update.is_none() && self.actions.is_empty()
    }
}

/// A component to be created by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewComponent {
    pub kind: String,
    pub properties: Value,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateOps {
    #[serde(rename = "self")]
    pub self_: SelfUpdate,
}

/// Property updates for the component being executed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfUpdate {
    pub properties: Value,
}

/// Additions and removals to a component's pending action set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSet {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub add: Vec<Operation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remove: Vec<Operation>,
}

impl ActionSet {
    pub fn add(mut self, op: Operation) -> Self {
        self.add.push(op);
        self
    }

    pub fn remove(mut self, op: Operation) -> Self {
        self.remove.push(op);
        self
    }
}
