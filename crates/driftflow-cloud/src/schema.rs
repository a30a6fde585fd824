//! Wire shape ⇄ declarative shape
//!
//! Provider responses are normalized on the way in (`transform_in`) and
//! request payloads are reshaped on the way out (`transform_out`). Only the
//! properties named in [`SchemaHints`] are touched.

use crate::value;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use url::Url;

/// Per-resource-type shape hints declared under `domain.extra.schema`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaHints {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub discriminators: Vec<Discriminator>,

    /// Dotted property paths holding resource URLs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,

    /// Dotted property paths where an object stands in for a scalar
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scalars: Vec<String>,
}

impl SchemaHints {
    pub fn is_empty(&self) -> bool {
        self.discriminators.is_empty() && self.references.is_empty() && self.scalars.is_empty()
    }
}

/// A flat object whose tag field selects which sibling fields are meaningful
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discriminator {
    /// Tag field name, e.g. `type`
    pub field: String,

    /// Dotted path to the discriminated object; empty for the root
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,

    /// Subtype key → variant
    pub variants: BTreeMap<String, Variant>,

    /// Sibling fields that stay at the top level for every subtype
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub common: Vec<String>,
}

/// Tag value of one subtype, optionally with the fields it owns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Variant {
    Tag(String),
    Fields { tag: String, fields: Vec<String> },
}

impl Variant {
    pub fn tag(&self) -> &str {
        match self {
            Variant::Tag(tag) | Variant::Fields { tag, .. } => tag,
        }
    }

    fn owns(&self, field: &str, common: &[String]) -> bool {
        match self {
            Variant::Tag(_) => !common.iter().any(|c| c == field),
            Variant::Fields { fields, .. } => fields.iter().any(|f| f == field),
        }
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('.').filter(|s| !s.is_empty()).collect()
}

fn object_at<'a>(tree: &'a mut Value, path: &str) -> Option<&'a mut Map<String, Value>> {
    let mut current = tree;
    for segment in segments(path) {
        current = current.get_mut(segment)?;
    }
    current.as_object_mut()
}

/// Normalize a provider response into declarative shape.
pub fn transform_in(body: &Value, hints: &SchemaHints) -> Value {
    let mut tree = body.clone();

    for path in &hints.references {
        let path = segments(path);
        if let Some(found) = value::get_path(&tree, &path) {
            let normalized = match found {
                Value::String(url) => Value::String(normalize_reference(url)),
                Value::Array(items) => Value::Array(
                    items
                        .iter()
                        .map(|item| match item {
                            Value::String(url) => Value::String(normalize_reference(url)),
                            other => other.clone(),
                        })
                        .collect(),
                ),
                _ => continue,
            };
            value::set_path(&mut tree, &path, normalized);
        }
    }

    for path in &hints.scalars {
        let path = segments(path);
        let scalar = match value::get_path(&tree, &path) {
            Some(Value::Object(map)) => map
                .get("name")
                .filter(|v| !value::is_empty(v))
                .or_else(|| map.get("id"))
                .cloned(),
            _ => None,
        };
        if let Some(scalar) = scalar {
            value::set_path(&mut tree, &path, scalar);
        }
    }

    for discriminator in &hints.discriminators {
        if let Some(object) = object_at(&mut tree, &discriminator.path) {
            nest(object, discriminator);
        }
    }

    tree
}

/// Reshape a declarative payload into the provider's wire shape.
pub fn transform_out(payload: &Value, hints: &SchemaHints) -> Value {
    let mut tree = payload.clone();
    for discriminator in &hints.discriminators {
        if let Some(object) = object_at(&mut tree, &discriminator.path) {
            flatten(object, discriminator);
        }
    }
    tree
}

fn nest(object: &mut Map<String, Value>, discriminator: &Discriminator) {
    let Some(tag) = object.get(&discriminator.field).and_then(Value::as_str) else {
        return;
    };
    let Some((subtype, variant)) = discriminator
        .variants
        .iter()
        .find(|(_, variant)| variant.tag() == tag)
    else {
        tracing::debug!(field = %discriminator.field, tag, "Unknown discriminator tag, leaving object flat");
        return;
    };

    object.remove(&discriminator.field);
    let owned: Vec<String> = object
        .keys()
        .filter(|key| variant.owns(key, &discriminator.common))
        .cloned()
        .collect();

    let mut nested = Map::new();
    for key in owned {
        if let Some(v) = object.remove(&key) {
            nested.insert(key, v);
        }
    }
    object.insert(subtype.clone(), Value::Object(nested));
}

fn flatten(object: &mut Map<String, Value>, discriminator: &Discriminator) {
    let present: Vec<&String> = discriminator
        .variants
        .keys()
        .filter(|key| object.get(*key).is_some_and(Value::is_object))
        .collect();
    let [subtype] = present.as_slice() else {
        return;
    };
    let Some(variant) = discriminator.variants.get(*subtype) else {
        return;
    };

    if let Some(Value::Object(nested)) = object.remove(*subtype) {
        object.extend(nested);
    }
    object.insert(
        discriminator.field.clone(),
        Value::String(variant.tag().to_string()),
    );
}

const LOCATION_SEGMENTS: [&str; 3] = ["regions", "zones", "locations"];

/// Shortest stable identifier for a resource URL.
///
/// Location-scoped URLs keep their last segment, other URLs keep the
/// `projects/...` suffix when present. Non-URL strings are returned as is.
pub fn normalize_reference(reference: &str) -> String {
    let parsed = Url::parse(reference).ok();
    let parts: Vec<&str> = match &parsed {
        Some(url) => match url.path_segments() {
            Some(segments) => segments.filter(|s| !s.is_empty()).collect(),
            None => return reference.to_string(),
        },
        None if reference.contains('/') => reference.split('/').filter(|s| !s.is_empty()).collect(),
        None => return reference.to_string(),
    };
    let Some(last) = parts.last() else {
        return reference.to_string();
    };

    if parts.iter().any(|p| LOCATION_SEGMENTS.contains(p)) {
        return last.to_string();
    }
    match parts.iter().position(|p| *p == "projects") {
        Some(start) => parts[start..].join("/"),
        None => last.to_string(),
    }
}
