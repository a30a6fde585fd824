//! Path access and tree utilities over JSON property trees
//!
//! Desired state, observed payloads and provider responses are all
//! `serde_json::Value` trees. The helpers here read and write them by
//! string-array paths, prune empty branches and compare trees.

use serde_json::{Map, Value};

/// Get the value at `path`, descending through objects (by key) and arrays (by index).
pub fn get_path<'a, S: AsRef<str>>(value: &'a Value, path: &[S]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, segment| {
        let segment = segment.as_ref();
        match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    })
}

/// Set `leaf` at `path`, creating intermediate objects as needed.
///
/// Non-container values found along the way are replaced with objects.
/// An empty path replaces the root.
pub fn set_path<S: AsRef<str>>(value: &mut Value, path: &[S], leaf: Value) {
    let Some((last, parents)) = path.split_last() else {
        *value = leaf;
        return;
    };

    let mut current = value;
    for segment in parents {
        current = child_mut(current, segment.as_ref());
    }

    let index = array_index(current, last.as_ref());
    match (current, index) {
        (Value::Array(items), Some(i)) => items[i] = leaf,
        (current, _) => {
            ensure_object(current).insert(last.as_ref().to_string(), leaf);
        }
    }
}

/// Remove the value at `path`, returning it if present.
pub fn remove_path<S: AsRef<str>>(value: &mut Value, path: &[S]) -> Option<Value> {
    let (last, parents) = path.split_last()?;
    let mut current = value;
    for segment in parents {
        let segment = segment.as_ref();
        current = match current {
            Value::Object(map) => map.get_mut(segment)?,
            Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    match current {
        Value::Object(map) => map.remove(last.as_ref()),
        _ => None,
    }
}

/// Index into `value` when it is an array and `segment` is an in-range index.
fn array_index(value: &Value, segment: &str) -> Option<usize> {
    match (value, segment.parse::<usize>()) {
        (Value::Array(items), Ok(i)) if i < items.len() => Some(i),
        _ => None,
    }
}

fn child_mut<'a>(value: &'a mut Value, segment: &str) -> &'a mut Value {
    let index = array_index(value, segment);
    match (value, index) {
        (Value::Array(items), Some(i)) => &mut items[i],
        (value, _) => ensure_object(value)
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new())),
    }
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    let Value::Object(map) = value else {
        unreachable!("value was just replaced with an object")
    };
    map
}

/// Whether a value carries no information: null, "", [] or {}.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Recursively drop empty values, bottom-up. An empty root prunes to `Null`.
pub fn prune(value: &Value) -> Value {
    let pruned = match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), prune(v)))
                .filter(|(_, v)| !is_empty(v))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(prune)
                .filter(|v| !is_empty(v))
                .collect(),
        ),
        other => other.clone(),
    };

    if is_empty(&pruned) {
        Value::Null
    } else {
        pruned
    }
}

/// Deep-merge `source` into `target`. Objects merge key by key, everything else is replaced.
pub fn merge(target: &mut Value, source: &Value) {
    match (target, source) {
        (Value::Object(target_map), Value::Object(source_map)) => {
            for (key, value) in source_map {
                match target_map.get_mut(key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        target_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, source) => *target = source.clone(),
    }
}

/// Whether `candidate` contains everything in `filter`.
///
/// Objects match when every filter key matches; arrays match when every
/// filter element matches some candidate element; scalars compare equal.
pub fn is_superset(candidate: &Value, filter: &Value) -> bool {
    match (candidate, filter) {
        (Value::Object(c), Value::Object(f)) => f
            .iter()
            .all(|(k, fv)| c.get(k).is_some_and(|cv| is_superset(cv, fv))),
        (Value::Array(c), Value::Array(f)) => {
            f.iter().all(|fv| c.iter().any(|cv| is_superset(cv, fv)))
        }
        (c, f) => c == f,
    }
}

/// RFC 6902 patch turning `current` into `desired`.
pub fn patch_between(current: &Value, desired: &Value) -> json_patch::Patch {
    json_patch::diff(current, desired)
}

/// Render a scalar as a string parameter. Empty strings and containers yield `None`.
pub fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
