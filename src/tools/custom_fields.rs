use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::ToolError;
use crate::services::dispatcher::ToolContext;
use crate::services::pipeline::{decode, step};
use crate::services::registry::{ToolDefinition, ToolHandler};
use crate::services::request::ApiRequest;
use crate::services::validation::{ensure_array, ensure_id, ensure_string, id_value};
use crate::tools::{api_schema, define, id_property};

const MATTER_WITH_FIELDS: &str = "id,display_number,description,client{name},\
custom_field_values{id,field_name,value,custom_field{id,field_type}}";

#[derive(Debug, Clone, Copy)]
pub enum CustomFieldTool {
    UpdateCustomField,
    CreateCustomFieldValue,
    GetMatterWithCustomFields,
    BulkUpdateCustomFields,
}

pub fn catalog() -> Vec<ToolDefinition> {
    vec![
        define(
            "update_custom_field",
            "Update a custom field value for a matter or contact",
            api_schema(
                json!({
                    "custom_field_value_id": id_property("ID of the custom field value to update"),
                    "value": {"type": "string", "description": "New value for the custom field"},
                }),
                &["custom_field_value_id", "value"],
            ),
            CustomFieldTool::UpdateCustomField,
        ),
        define(
            "create_custom_field_value",
            "Create a new custom field value for a matter or contact",
            api_schema(
                json!({
                    "custom_field_id": id_property("ID of the custom field definition"),
                    "parent_id": id_property("ID of the parent (matter or contact)"),
                    "parent_type": {
                        "type": "string",
                        "description": "Type of parent (Matter or Contact)",
                        "enum": ["Matter", "Contact"]
                    },
                    "value": {"type": "string", "description": "Value for the custom field"},
                }),
                &["custom_field_id", "parent_id", "parent_type", "value"],
            ),
            CustomFieldTool::CreateCustomFieldValue,
        ),
        define(
            "get_matter_with_custom_fields",
            "Get a matter with all its custom field values",
            api_schema(json!({"matter_id": id_property("Matter ID")}), &["matter_id"]),
            CustomFieldTool::GetMatterWithCustomFields,
        ),
        define(
            "bulk_update_custom_fields",
            "Update multiple custom fields for a matter at once",
            api_schema(
                json!({
                    "matter_id": id_property("Matter ID"),
                    "updates": {
                        "type": "array",
                        "description": "Array of field updates",
                        "items": {
                            "type": "object",
                            "properties": {
                                "field_name": {"type": "string", "description": "Name of the custom field"},
                                "value": {"type": "string", "description": "New value"}
                            },
                            "required": ["field_name", "value"]
                        }
                    },
                }),
                &["matter_id", "updates"],
            ),
            CustomFieldTool::BulkUpdateCustomFields,
        ),
    ]
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Default, Deserialize)]
struct MatterFieldValues {
    #[serde(default)]
    custom_field_values: Vec<FieldValue>,
}

#[derive(Debug, Deserialize)]
struct FieldValue {
    id: Value,
    #[serde(default)]
    field_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FieldDefinition {
    id: Value,
    #[serde(default)]
    name: Option<String>,
}

fn outcome(field_name: &str, status: &str, result: Result<Value, ToolError>) -> Value {
    match result {
        Ok(response) => json!({
            "field_name": field_name,
            "status": status,
            "value": response.pointer("/data/value").cloned().unwrap_or(Value::Null),
        }),
        Err(err) => json!({
            "field_name": field_name,
            "status": "error",
            "error": err.to_string(),
        }),
    }
}

/// Patches values the matter already has and creates the rest from the
/// matching field definition. Per-field failures are reported inline; only
/// the lookups abort the whole call.
async fn bulk_update(ctx: &ToolContext, args: &Value) -> Result<Value, ToolError> {
    let matter_id = ensure_id(args, "matter_id")?;
    let updates = ensure_array(args, "updates")?;

    let matter: Envelope<MatterFieldValues> = step("fetch_matter", async {
        let response = ctx
            .call(
                ApiRequest::get(format!("/matters/{}", matter_id))
                    .query("fields", "custom_field_values{id,field_name,value}"),
            )
            .await?;
        decode("fetch_matter", response)
    })
    .await?;

    let mut definitions: Option<Vec<FieldDefinition>> = None;
    let mut results = Vec::with_capacity(updates.len());
    for update in updates {
        let field_name = match ensure_string(update, "field_name") {
            Ok(name) => name,
            Err(err) => {
                let label = update.get("field_name").and_then(Value::as_str).unwrap_or("");
                results.push(outcome(label, "error", Err(err)));
                continue;
            }
        };
        let value = update.get("value").cloned().unwrap_or(Value::Null);

        let existing = matter
            .data
            .custom_field_values
            .iter()
            .find(|cfv| cfv.field_name.as_deref() == Some(field_name.as_str()));
        if let Some(existing) = existing {
            let id = match &existing.id {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            let result = ctx
                .call(
                    ApiRequest::patch(format!("/custom_field_values/{}", id))
                        .body(json!({"data": {"value": value}})),
                )
                .await;
            results.push(outcome(&field_name, "updated", result));
            continue;
        }

        if definitions.is_none() {
            let fetched: Envelope<Vec<FieldDefinition>> = step("fetch_field_definitions", async {
                let response = ctx
                    .call(
                        ApiRequest::get("/custom_fields")
                            .query("parent_type", "Matter")
                            .query("fields", "id,name"),
                    )
                    .await?;
                decode("fetch_field_definitions", response)
            })
            .await?;
            definitions = Some(fetched.data);
        }
        let definition = definitions
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find(|def| def.name.as_deref() == Some(field_name.as_str()));
        let Some(definition) = definition else {
            results.push(json!({
                "field_name": field_name,
                "status": "error",
                "error": "Custom field not found",
            }));
            continue;
        };
        let result = ctx
            .call(ApiRequest::post("/custom_field_values").body(json!({
                "data": {
                    "custom_field": {"id": definition.id},
                    "parent": {"id": id_value(args, "matter_id"), "type": "Matter"},
                    "value": value,
                }
            })))
            .await;
        results.push(outcome(&field_name, "created", result));
    }

    Ok(json!({ "results": results }))
}

#[async_trait]
impl ToolHandler for CustomFieldTool {
    async fn handle(&self, ctx: &ToolContext, args: Value) -> Result<Value, ToolError> {
        match self {
            CustomFieldTool::UpdateCustomField => {
                let id = ensure_id(&args, "custom_field_value_id")?;
                let value = args.get("value").cloned().unwrap_or(Value::Null);
                ctx.call(
                    ApiRequest::patch(format!("/custom_field_values/{}", id))
                        .body(json!({"data": {"value": value}})),
                )
                .await
            }
            CustomFieldTool::CreateCustomFieldValue => {
                let body = json!({
                    "data": {
                        "custom_field": {"id": id_value(&args, "custom_field_id")},
                        "parent": {
                            "id": id_value(&args, "parent_id"),
                            "type": ensure_string(&args, "parent_type")?,
                        },
                        "value": args.get("value").cloned().unwrap_or(Value::Null),
                    }
                });
                ctx.call(ApiRequest::post("/custom_field_values").body(body))
                    .await
            }
            CustomFieldTool::GetMatterWithCustomFields => {
                let matter_id = ensure_id(&args, "matter_id")?;
                ctx.call(
                    ApiRequest::get(format!("/matters/{}", matter_id))
                        .query("fields", MATTER_WITH_FIELDS),
                )
                .await
            }
            CustomFieldTool::BulkUpdateCustomFields => bulk_update(ctx, &args).await,
        }
    }
}
