use async_trait::async_trait;
use jsonschema::JSONSchema;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::ToolError;
use crate::services::dispatcher::ToolContext;
use crate::utils::suggest::suggest;

#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn handle(&self, ctx: &ToolContext, args: Value) -> Result<Value, ToolError>;
}

#[derive(Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub handler: Arc<dyn ToolHandler>,
}

impl ToolDefinition {
    pub fn new(
        name: &str,
        description: &str,
        input_schema: Value,
        handler: Arc<dyn ToolHandler>,
    ) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema,
            handler,
        }
    }

    pub fn listing(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema,
        })
    }
}

pub struct RegisteredTool {
    pub definition: ToolDefinition,
    validator: JSONSchema,
}

impl RegisteredTool {
    pub fn validate(&self, args: &Value) -> Result<(), ToolError> {
        if let Err(errors) = self.validator.validate(args) {
            let lines: Vec<String> = errors.map(|err| format_schema_error(&err)).collect();
            return Err(ToolError::invalid_params(format!(
                "Invalid arguments for {}:\n- {}",
                self.definition.name,
                lines.join("\n- ")
            )));
        }
        Ok(())
    }
}

fn format_schema_error(err: &jsonschema::ValidationError<'_>) -> String {
    let path = err.instance_path.to_string();
    let location = if path.is_empty() {
        "arguments".to_string()
    } else {
        path
    };
    match &err.kind {
        jsonschema::error::ValidationErrorKind::Required { property } => {
            let prop = property
                .as_str()
                .map(|s| s.to_string())
                .unwrap_or_else(|| property.to_string());
            format!("{}: missing required field '{}'", location, prop)
        }
        _ => format!("{}: {}", location, err),
    }
}

/// Immutable set of tools, in catalog order.
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn register(catalogs: Vec<Vec<ToolDefinition>>) -> Result<Self, ToolError> {
        let mut tools = Vec::new();
        let mut index = HashMap::new();
        for definition in catalogs.into_iter().flatten() {
            if index.contains_key(&definition.name) {
                return Err(ToolError::internal(format!(
                    "Duplicate tool name: {}",
                    definition.name
                )));
            }
            let validator = JSONSchema::compile(&definition.input_schema).map_err(|err| {
                ToolError::internal(format!(
                    "Invalid input schema for {}: {}",
                    definition.name, err
                ))
            })?;
            index.insert(definition.name.clone(), tools.len());
            tools.push(RegisteredTool {
                definition,
                validator,
            });
        }
        Ok(Self { tools, index })
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.index.get(name).map(|idx| &self.tools[*idx])
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools
            .iter()
            .map(|tool| tool.definition.name.clone())
            .collect()
    }

    pub fn list(&self) -> Vec<Value> {
        self.tools
            .iter()
            .map(|tool| tool.definition.listing())
            .collect()
    }

    pub fn unknown_tool(&self, name: &str) -> ToolError {
        let err = ToolError::tool_not_found(name);
        let suggestions = suggest(name, &self.names(), 3);
        if suggestions.is_empty() {
            return err;
        }
        err.with_hint(format!("Did you mean: {}", suggestions.join(", ")))
    }
}
