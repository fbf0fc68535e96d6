//! Built-in tool catalogs. Each module owns its schemas and one handler enum
//! whose variants map one-to-one to tool names.

pub mod auth;
pub mod communication;
pub mod custom_fields;
pub mod documents;
pub mod firm;
pub mod leads;
pub mod practice;

use serde_json::{Map, Value};
use std::sync::Arc;

use crate::services::registry::{ToolDefinition, ToolHandler};

pub fn builtin_catalogs() -> Vec<Vec<ToolDefinition>> {
    vec![
        practice::catalog(),
        auth::catalog(),
        firm::catalog(),
        custom_fields::catalog(),
        communication::catalog(),
        leads::catalog(),
        documents::catalog(),
    ]
}

pub(crate) fn define<H: ToolHandler + 'static>(
    name: &str,
    description: &str,
    input_schema: Value,
    handler: H,
) -> ToolDefinition {
    ToolDefinition::new(name, description, input_schema, Arc::new(handler))
}

/// Object schema without the per-call token override.
pub(crate) fn object_schema(properties: Value, required: &[&str]) -> Value {
    let mut schema = Map::new();
    schema.insert("type".to_string(), Value::String("object".to_string()));
    schema.insert("properties".to_string(), properties);
    if !required.is_empty() {
        schema.insert(
            "required".to_string(),
            Value::Array(
                required
                    .iter()
                    .map(|name| Value::String(name.to_string()))
                    .collect(),
            ),
        );
    }
    Value::Object(schema)
}

/// Object schema for tools that call the backend; adds `access_token`.
pub(crate) fn api_schema(properties: Value, required: &[&str]) -> Value {
    let mut properties = match properties {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    properties.insert(
        "access_token".to_string(),
        serde_json::json!({
            "type": "string",
            "description": "Clio API access token (optional if configured)",
        }),
    );
    object_schema(Value::Object(properties), required)
}

pub(crate) fn id_property(description: &str) -> Value {
    serde_json::json!({"type": ["number", "string"], "description": description})
}

pub(crate) fn limit_property(what: &str, default: u64) -> Value {
    serde_json::json!({
        "type": "number",
        "description": format!("Number of {} to retrieve (default: {})", what, default),
        "default": default,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::registry::ToolRegistry;

    #[test]
    fn builtin_catalog_registers_without_conflicts() {
        let registry = ToolRegistry::register(builtin_catalogs()).expect("catalog must be valid");
        assert_eq!(registry.len(), 44);
        let names = registry.names();
        assert_eq!(names.first().map(String::as_str), Some("get_matters"));
        assert!(names.iter().any(|n| n == "convert_lead_to_matter"));
        assert!(names.iter().any(|n| n == "refresh_access_token"));
    }

    #[test]
    fn api_schema_adds_token_property() {
        let schema = api_schema(serde_json::json!({"limit": {"type": "number"}}), &["limit"]);
        assert_eq!(schema["properties"]["access_token"]["type"], "string");
        assert_eq!(schema["required"], serde_json::json!(["limit"]));
        let bare = object_schema(serde_json::json!({}), &[]);
        assert!(bare.get("required").is_none());
    }
}
