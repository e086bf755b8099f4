use serde_json::{Map, Value};

use crate::error::{Error, Result};

pub const DEFAULT_SEPARATOR: &str = "_";

/// Collapses nested mappings into a single level, joining ancestor keys with `separator`.
/// Sequences are kept as values.
pub fn flatten(map: &Map<String, Value>, separator: &str) -> Map<String, Value> {
    let mut out = Map::new();
    flatten_into(map, separator, "", &mut out);
    out
}

fn flatten_into(map: &Map<String, Value>, separator: &str, prefix: &str, out: &mut Map<String, Value>) {
    for (k, v) in map {
        let key = if prefix.is_empty() {
            k.clone()
        } else {
            format!("{}{}{}", prefix, separator, k)
        };
        match v {
            Value::Object(child) => flatten_into(child, separator, &key, out),
            other => {
                out.insert(key, other.clone());
            }
        }
    }
}

/// Flattens objects; any other value is returned unchanged.
pub fn flatten_value(value: &Value, separator: &str) -> Value {
    match value {
        Value::Object(map) => Value::Object(flatten(map, separator)),
        other => other.clone(),
    }
}

/// Re-nests a flat mapping by splitting its keys on `separator`.
pub fn unflatten(map: &Map<String, Value>, separator: &str) -> Result<Map<String, Value>> {
    if separator.is_empty() {
        return Err(Error::InvalidArgument("separator must not be empty".into()));
    }
    let mut out = Map::new();
    for (key, value) in map {
        let mut parts = key.split(separator).peekable();
        let mut node = &mut out;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                if node.contains_key(part) {
                    return Err(Error::InvalidArgument(format!("conflicting key: {}", key)));
                }
                node.insert(part.to_string(), value.clone());
                break;
            }
            let slot = node
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            node = slot
                .as_object_mut()
                .ok_or_else(|| Error::InvalidArgument(format!("conflicting key: {}", key)))?;
        }
    }
    Ok(out)
}

fn is_empty(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(m) => m.is_empty(),
        _ => false,
    }
}

/// Recursively removes null and empty values (strings, mappings, sequences).
/// Containers left empty by the pruning are removed as well.
pub fn strip_empty(value: &mut Value) {
    match value {
        Value::Object(map) => map.retain(|_, v| {
            strip_empty(v);
            !is_empty(v)
        }),
        Value::Array(arr) => arr.retain_mut(|v| {
            strip_empty(v);
            !is_empty(v)
        }),
        _ => {}
    }
}

/// Renames every key by substituting it for the first `{}` in `template`.
pub fn format_keys(map: &Map<String, Value>, template: &str) -> Result<Map<String, Value>> {
    if !template.contains("{}") {
        return Err(Error::InvalidArgument(format!(
            "key template has no {{}} placeholder: {}",
            template
        )));
    }
    Ok(map
        .iter()
        .map(|(k, v)| (template.replacen("{}", k, 1), v.clone()))
        .collect())
}

/// Keeps only the mapping entries whose key satisfies `keep`, at every level.
pub fn filter_keys<F>(value: &Value, keep: &F) -> Value
where
    F: Fn(&str) -> bool,
{
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(k, _)| keep(k))
                .map(|(k, v)| (k.clone(), filter_keys(v, keep)))
                .collect(),
        ),
        Value::Array(arr) => Value::Array(arr.iter().map(|v| filter_keys(v, keep)).collect()),
        other => other.clone(),
    }
}

/// Applies `f` to every mapping key, at every level.
pub fn map_keys<F>(value: &Value, f: &F) -> Value
where
    F: Fn(&str) -> String,
{
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (f(k), map_keys(v, f)))
                .collect(),
        ),
        Value::Array(arr) => Value::Array(arr.iter().map(|v| map_keys(v, f)).collect()),
        other => other.clone(),
    }
}
