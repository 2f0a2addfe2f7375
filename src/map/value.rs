//! Locating values inside decoded documents and turning them into column text

use crate::error::{DataError, ValueShape};
use crate::map::spec::SourcePath;
use crate::map::types::UserData;
use serde_json::Value;

/// Follow `path` through objects (by key) and lists (by index)
pub fn locate<'a>(value: &'a Value, path: &SourcePath) -> Option<&'a Value> {
    path.segments()
        .iter()
        .try_fold(value, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get(index)),
            _ => None,
        })
}

/// Look up the injected value for a `user` node. Never touches the record.
pub fn resolve_user_data<'a>(key: &str, user_data: &'a UserData) -> Option<&'a Value> {
    user_data.get(key)
}

/// Absent, null, and empty strings, lists or objects carry no data
pub fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        Some(_) => false,
    }
}

/// Convert a located value into the text stored in `column`.
///
/// Scalars are written as-is, missing values as an empty string. Lists and
/// objects are refused unless `force_type` is set, in which case they are
/// flattened into a bracketed, comma-joined string.
pub fn coerce(value: Option<&Value>, force_type: bool, column: &str) -> Result<String, DataError> {
    let Some(value) = value else {
        return Ok(String::new());
    };

    let shape = match value {
        Value::Array(items) if items.is_empty() => return Ok(String::new()),
        Value::Object(map) if map.is_empty() => return Ok(String::new()),
        Value::Array(_) => ValueShape::Array,
        Value::Object(_) => ValueShape::Object,
        scalar => return Ok(scalar_text(scalar)),
    };

    if force_type {
        Ok(stringify(value))
    } else {
        Err(DataError {
            column: column.to_string(),
            shape,
        })
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        composite => stringify(composite),
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(stringify).collect();
            format!("[{}]", parts.join(","))
        }
        Value::Object(map) => {
            let parts: Vec<String> = map
                .iter()
                .map(|(key, item)| format!("{}:{}", key, stringify(item)))
                .collect();
            format!("{{{}}}", parts.join(","))
        }
        scalar => scalar_text(scalar),
    }
}

/// Human-readable JSON type name, used in error messages
pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
