//! Dotted-path reads and writes over a layer tree.
//!
//! Writes always create missing intermediate objects. Lookups used for secure
//! value hydration and redaction never create anything.

use crate::config::tree::ConfigTree;
use crate::error::ApiError;
use serde_json::{Map, Number, Value};

/// Top-level prefix whose values must be arrays.
pub const GROUP_PREFIX: &str = "group";

/// Options for [`set_path`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Record the path in the layer's `secure` list.
    pub secure: bool,
    /// Push onto an existing array instead of overwriting.
    pub append: bool,
}

pub fn split_path(path: &str) -> Result<Vec<&str>, ApiError> {
    let segments: Vec<&str> = path.split('.').collect();
    if path.is_empty() || segments.iter().any(|s| s.is_empty()) {
        return Err(ApiError::Validation(format!(
            "invalid property path \"{}\"",
            path
        )));
    }
    Ok(segments)
}

/// Best-effort scalar coercion for string input.
///
/// `"true"`/`"false"` become booleans and anything that parses entirely as a
/// finite float becomes an integer by truncation. Other values pass through.
pub fn coerce(value: Value) -> Value {
    let Value::String(raw) = &value else {
        return value;
    };
    match raw.as_str() {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return value;
    }
    match trimmed.parse::<f64>() {
        Ok(number) if number.is_finite() => {
            let truncated = number.trunc();
            if truncated >= i64::MIN as f64 && truncated <= i64::MAX as f64 {
                Value::Number(Number::from(truncated as i64))
            } else {
                Number::from_f64(truncated).map(Value::Number).unwrap_or(value)
            }
        }
        _ => value,
    }
}

/// Write `value` at `path` inside `tree`.
pub fn set_path(tree: &mut ConfigTree, path: &str, value: Value, opts: SetOptions) -> Result<(), ApiError> {
    if path.starts_with(GROUP_PREFIX) && !value.is_array() {
        return Err(ApiError::Validation(
            "group property must be an array".to_string(),
        ));
    }

    let segments = split_path(path)?;
    let (leaf, parents) = segments
        .split_last()
        .ok_or_else(|| ApiError::Validation(format!("invalid property path \"{}\"", path)))?;

    let mut node = tree.as_map_mut();
    for segment in parents {
        let slot = node
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if slot.is_null() {
            *slot = Value::Object(Map::new());
        }
        node = match slot {
            Value::Object(map) => map,
            _ => {
                return Err(ApiError::Validation(format!(
                    "property {} is not an object at \"{}\"",
                    path, segment
                )))
            }
        };
    }

    let value = coerce(value);
    if opts.append {
        match node.get_mut(*leaf) {
            Some(Value::Array(items)) => items.push(value),
            _ => {
                return Err(ApiError::Validation(format!(
                    "property {} is not an array",
                    path
                )))
            }
        }
    } else {
        node.insert(leaf.to_string(), value);
    }

    if opts.secure {
        tree.add_secure(path);
    }
    // Writing into a structural key can change its shape.
    tree.normalize();
    Ok(())
}

/// Look up `path`; `None` when any segment is missing.
pub fn get_path<'a>(map: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = map.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Mutable lookup that never creates structure: every segment, the leaf
/// included, must already be present and non-null.
pub fn existing_leaf_mut<'a>(map: &'a mut Map<String, Value>, path: &str) -> Option<&'a mut Value> {
    let segments: Vec<&str> = path.split('.').collect();
    let (leaf, parents) = segments.split_last()?;
    let mut node = map;
    for segment in parents {
        node = match node.get_mut(*segment) {
            Some(Value::Object(next)) => next,
            _ => return None,
        };
    }
    match node.get_mut(*leaf) {
        Some(Value::Null) | None => None,
        Some(value) => Some(value),
    }
}
