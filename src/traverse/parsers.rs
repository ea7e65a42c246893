//! Container parsers
//!
//! Each parser teaches the factory to treat one runtime shape as a keyed
//! container. The dotted-string parsers expose a single key (the first
//! path segment) whose value is the remainder of the path, which is what
//! lets `"a.b.c"` and `{"a": {"b": {"c": ...}}}` share one node loop.

use serde_json::Value;

use super::factory::ContainerParser;

/// Plain JSON object as a keyed container
pub struct ObjectParser;

impl ContainerParser for ObjectParser {
    fn matches(&self, data: &Value) -> bool {
        data.is_object()
    }

    fn keys(&self, data: &Value) -> Vec<String> {
        match data.as_object() {
            Some(map) => map.keys().cloned().collect(),
            None => Vec::new(),
        }
    }

    fn get(&self, key: &str, data: &Value) -> Option<Value> {
        data.as_object().and_then(|map| map.get(key)).cloned()
    }

    fn set(&self, key: &str, value: Value, data: &mut Value) {
        if let Some(map) = data.as_object_mut() {
            map.insert(key.to_string(), value);
        }
    }

    fn remove(&self, key: &str, data: &mut Value) {
        if let Some(map) = data.as_object_mut() {
            map.remove(key);
        }
    }
}

/// Dotted attribute path (`"author.name"`) as a single-key container:
/// the key is the first segment, the value is the remainder. Removal
/// collapses the whole string to `""`.
pub struct PathParser;

fn root_of(s: &str) -> Option<&str> {
    let root = s.split('.').next().unwrap_or("");
    if root.is_empty() { None } else { Some(root) }
}

impl ContainerParser for PathParser {
    fn matches(&self, data: &Value) -> bool {
        data.is_string()
    }

    fn transform(&self, data: Value) -> Value {
        match data.as_str() {
            Some(s) => Value::String(s.trim().to_string()),
            None => data,
        }
    }

    fn keys(&self, data: &Value) -> Vec<String> {
        data.as_str()
            .and_then(root_of)
            .map(|root| vec![root.to_string()])
            .unwrap_or_default()
    }

    fn get(&self, key: &str, data: &Value) -> Option<Value> {
        let s = data.as_str()?;
        let (root, rest) = match s.split_once('.') {
            Some((root, rest)) => (root, rest),
            None => (s, ""),
        };
        (root == key).then(|| Value::String(rest.to_string()))
    }

    fn set(&self, key: &str, value: Value, data: &mut Value) {
        let Some(s) = data.as_str() else { return };
        if root_of(s) != Some(key) {
            return;
        }
        let rest = value.as_str().unwrap_or("");
        *data = if rest.is_empty() {
            Value::String(key.to_string())
        } else {
            Value::String(format!("{key}.{rest}"))
        };
    }

    fn remove(&self, key: &str, data: &mut Value) {
        let Some(s) = data.as_str() else { return };
        if root_of(s) == Some(key) {
            *data = Value::String(String::new());
        }
    }
}

/// Like [`PathParser`] but understands a trailing `:asc` / `:desc` order
/// token (case-insensitive). The order token never becomes a key; it is
/// carried with the deepest remaining segment and reattached on `set`.
pub struct SortPathParser;

fn split_order(s: &str) -> (&str, Option<&str>) {
    match s.rsplit_once(':') {
        Some((path, order))
            if order.eq_ignore_ascii_case("asc") || order.eq_ignore_ascii_case("desc") =>
        {
            (path, Some(order))
        }
        _ => (s, None),
    }
}

impl ContainerParser for SortPathParser {
    fn matches(&self, data: &Value) -> bool {
        data.is_string()
    }

    fn transform(&self, data: Value) -> Value {
        match data.as_str() {
            Some(s) => Value::String(s.trim().to_string()),
            None => data,
        }
    }

    fn keys(&self, data: &Value) -> Vec<String> {
        data.as_str()
            .map(|s| split_order(s).0)
            .and_then(root_of)
            .map(|root| vec![root.to_string()])
            .unwrap_or_default()
    }

    fn get(&self, key: &str, data: &Value) -> Option<Value> {
        let s = data.as_str()?;
        let (path, order) = split_order(s);
        let (root, rest) = match path.split_once('.') {
            Some((root, rest)) => (root, rest),
            None => (path, ""),
        };
        if root != key {
            return None;
        }
        // A non-empty remainder keeps the order token attached so the
        // deepest level can reattach it
        let value = match (rest, order) {
            ("", _) => String::new(),
            (rest, Some(order)) => format!("{rest}:{order}"),
            (rest, None) => rest.to_string(),
        };
        Some(Value::String(value))
    }

    fn set(&self, key: &str, value: Value, data: &mut Value) {
        let Some(s) = data.as_str() else { return };
        let (path, order) = split_order(s);
        if root_of(path) != Some(key) {
            return;
        }
        let rest = value.as_str().unwrap_or("");
        *data = if rest.is_empty() {
            match order {
                Some(order) => Value::String(format!("{key}:{order}")),
                None => Value::String(key.to_string()),
            }
        } else {
            Value::String(format!("{key}.{rest}"))
        };
    }

    fn remove(&self, key: &str, data: &mut Value) {
        let Some(s) = data.as_str() else { return };
        if root_of(split_order(s).0) == Some(key) {
            *data = Value::String(String::new());
        }
    }
}
