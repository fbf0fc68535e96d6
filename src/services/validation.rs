use crate::errors::ToolError;
use serde_json::Value;

fn field<'a>(args: &'a Value, key: &str) -> Option<&'a Value> {
    args.get(key).filter(|value| !value.is_null())
}

pub fn ensure_string(args: &Value, key: &str) -> Result<String, ToolError> {
    let text = field(args, key)
        .and_then(|value| value.as_str())
        .ok_or_else(|| ToolError::invalid_params(format!("{} must be a non-empty string", key)))?;
    if text.trim().is_empty() {
        return Err(ToolError::invalid_params(format!(
            "{} must be a non-empty string",
            key
        )));
    }
    Ok(text.to_string())
}

/// Absent, null and empty strings all read as `None`.
pub fn optional_string(args: &Value, key: &str) -> Result<Option<String>, ToolError> {
    match field(args, key) {
        None => Ok(None),
        Some(Value::String(text)) if text.is_empty() => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(_) => Err(ToolError::invalid_params(format!("{} must be a string", key))),
    }
}

pub fn string_or(args: &Value, key: &str, default: &str) -> Result<String, ToolError> {
    Ok(optional_string(args, key)?.unwrap_or_else(|| default.to_string()))
}

/// Record identifiers arrive as numbers or strings; both render into paths.
pub fn ensure_id(args: &Value, key: &str) -> Result<String, ToolError> {
    optional_id(args, key)?
        .ok_or_else(|| ToolError::invalid_params(format!("{} is required", key)))
}

pub fn optional_id(args: &Value, key: &str) -> Result<Option<String>, ToolError> {
    match field(args, key) {
        None => Ok(None),
        Some(Value::Number(number)) => Ok(Some(number.to_string())),
        Some(Value::String(text)) if text.trim().is_empty() => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.trim().to_string())),
        Some(_) => Err(ToolError::invalid_params(format!(
            "{} must be a number or string id",
            key
        ))),
    }
}

/// Identifier as given, for embedding in request bodies.
pub fn id_value(args: &Value, key: &str) -> Option<Value> {
    field(args, key)
        .filter(|value| !matches!(value, Value::String(text) if text.is_empty()))
        .cloned()
}

/// Page size; missing or zero falls back to `default`.
pub fn limit_or(args: &Value, key: &str, default: u64) -> u64 {
    let parsed = field(args, key).and_then(|value| {
        value
            .as_u64()
            .or_else(|| value.as_f64().filter(|n| *n >= 0.0).map(|n| n as u64))
    });
    match parsed {
        Some(0) | None => default,
        Some(limit) => limit,
    }
}

pub fn optional_bool(args: &Value, key: &str) -> Option<bool> {
    field(args, key).and_then(|value| value.as_bool())
}

pub fn optional_array<'a>(args: &'a Value, key: &str) -> Result<Option<&'a Vec<Value>>, ToolError> {
    match field(args, key) {
        None => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items)),
        Some(_) => Err(ToolError::invalid_params(format!("{} must be an array", key))),
    }
}

pub fn ensure_array<'a>(args: &'a Value, key: &str) -> Result<&'a Vec<Value>, ToolError> {
    optional_array(args, key)?
        .ok_or_else(|| ToolError::invalid_params(format!("{} must be an array", key)))
}

pub fn optional_object(args: &Value, key: &str) -> Option<Value> {
    field(args, key).filter(|value| value.is_object()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ids_accept_numbers_and_strings() {
        let args = json!({"a": 42, "b": " 17 ", "c": "", "d": true});
        assert_eq!(ensure_id(&args, "a").expect("a"), "42");
        assert_eq!(ensure_id(&args, "b").expect("b"), "17");
        assert!(ensure_id(&args, "c").is_err());
        assert!(ensure_id(&args, "d").is_err());
        assert!(ensure_id(&args, "missing").is_err());
    }

    #[test]
    fn limit_defaults_on_missing_or_zero() {
        assert_eq!(limit_or(&json!({}), "limit", 10), 10);
        assert_eq!(limit_or(&json!({"limit": 0}), "limit", 10), 10);
        assert_eq!(limit_or(&json!({"limit": 5}), "limit", 10), 5);
        assert_eq!(limit_or(&json!({"limit": 7.0}), "limit", 10), 7);
        assert_eq!(limit_or(&json!({"limit": "25"}), "limit", 10), 10);
    }

    #[test]
    fn optional_string_treats_empty_as_absent() {
        let args = json!({"status": "", "other": "open", "bad": 3});
        assert_eq!(optional_string(&args, "status").expect("ok"), None);
        assert_eq!(
            optional_string(&args, "other").expect("ok").as_deref(),
            Some("open")
        );
        assert!(optional_string(&args, "bad").is_err());
        assert!(ensure_string(&args, "status").is_err());
    }
}
