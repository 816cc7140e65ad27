//! Query-string and form encoding of [`Params`].
//!
//! Nested values are flattened with bracket notation, `a[b]=1` for objects
//! and `a[0]=x` for arrays. Null values are skipped.

use serde_json::Value;
use url::form_urlencoded;

use crate::request::Params;

/// Flatten `params` into key/value pairs using bracket notation.
pub fn flatten(params: &Params) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in params {
        flatten_value(key.clone(), value, &mut pairs);
    }
    pairs
}

fn flatten_value(prefix: String, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Bool(b) => out.push((prefix, b.to_string())),
        Value::Number(n) => out.push((prefix, n.to_string())),
        Value::String(s) => out.push((prefix, s.clone())),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten_value(format!("{prefix}[{i}]"), item, out);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                flatten_value(format!("{prefix}[{key}]"), item, out);
            }
        }
    }
}

/// Encode `params` as an `application/x-www-form-urlencoded` string.
pub fn to_query_string(params: &Params) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in flatten(params) {
        serializer.append_pair(&key, &value);
    }
    serializer.finish()
}

/// Turn the top-level entries of `params` into multipart text fields.
///
/// Strings are sent verbatim, arrays become one field per element and
/// every other value is rendered as JSON.
pub fn to_multipart_fields(params: &Params) -> Vec<(String, String)> {
    let mut fields = Vec::new();
    for (key, value) in params {
        match value {
            Value::Array(items) => {
                for item in items {
                    fields.push((key.clone(), field_text(item)));
                }
            }
            other => fields.push((key.clone(), field_text(other))),
        }
    }
    fields
}

fn field_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
