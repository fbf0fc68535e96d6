use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::errors::ToolError;
use crate::services::dispatcher::ToolContext;
use crate::services::registry::{ToolDefinition, ToolHandler};
use crate::services::request::ApiRequest;
use crate::services::validation::{
    ensure_array, ensure_id, ensure_string, limit_or, optional_array, optional_bool, optional_id,
    optional_string,
};
use crate::tools::{api_schema, define, id_property, limit_property};

const DEFAULT_SEARCH_RESOURCES: [&str; 2] = ["matters", "contacts"];

#[derive(Debug, Clone, Copy)]
pub enum FirmTool {
    GetBills,
    GetTimelineEvents,
    GetCustomFields,
    CreateWebhook,
    GetWebhooks,
    GetUsers,
    GetCurrentUser,
    GetTrustAccounts,
    GetAllocations,
    Search,
}

pub fn catalog() -> Vec<ToolDefinition> {
    vec![
        define(
            "get_bills",
            "Get list of bills from Clio",
            api_schema(
                json!({
                    "status": {
                        "type": "string",
                        "description": "Filter by bill status (draft, pending, paid)",
                        "enum": ["draft", "pending", "paid"]
                    },
                    "limit": limit_property("bills", 10),
                }),
                &[],
            ),
            FirmTool::GetBills,
        ),
        define(
            "get_timeline_events",
            "Get timeline events for a matter",
            api_schema(
                json!({
                    "matter_id": id_property("Matter ID to get timeline events for"),
                    "limit": limit_property("events", 20),
                }),
                &["matter_id"],
            ),
            FirmTool::GetTimelineEvents,
        ),
        define(
            "get_custom_fields",
            "Get custom field definitions",
            api_schema(
                json!({
                    "parent_type": {
                        "type": "string",
                        "description": "Parent type for custom fields (matter, contact, etc.)",
                        "enum": ["matter", "contact", "company"]
                    },
                }),
                &[],
            ),
            FirmTool::GetCustomFields,
        ),
        define(
            "create_webhook",
            "Create a webhook subscription",
            api_schema(
                json!({
                    "url": {"type": "string", "description": "Webhook endpoint URL"},
                    "events": {
                        "type": "array",
                        "description": "Events to subscribe to",
                        "items": {
                            "type": "string",
                            "enum": [
                                "matter.created", "matter.updated", "contact.created",
                                "contact.updated", "task.created", "task.completed"
                            ]
                        }
                    },
                    "secret": {"type": "string", "description": "Webhook secret for verification"},
                }),
                &["url", "events"],
            ),
            FirmTool::CreateWebhook,
        ),
        define(
            "get_webhooks",
            "Get list of webhook subscriptions",
            api_schema(json!({}), &[]),
            FirmTool::GetWebhooks,
        ),
        define(
            "get_users",
            "Get list of users in the firm",
            api_schema(
                json!({
                    "enabled": {"type": "boolean", "description": "Filter by enabled status"},
                    "limit": limit_property("users", 10),
                }),
                &[],
            ),
            FirmTool::GetUsers,
        ),
        define(
            "get_current_user",
            "Get information about the authenticated user",
            api_schema(json!({}), &[]),
            FirmTool::GetCurrentUser,
        ),
        define(
            "get_trust_accounts",
            "Get trust account information",
            api_schema(json!({"limit": limit_property("accounts", 10)}), &[]),
            FirmTool::GetTrustAccounts,
        ),
        define(
            "get_allocations",
            "Get billing allocations",
            api_schema(
                json!({
                    "matter_id": id_property("Filter by matter ID"),
                    "limit": limit_property("allocations", 10),
                }),
                &[],
            ),
            FirmTool::GetAllocations,
        ),
        define(
            "search",
            "Search across multiple Clio resources",
            api_schema(
                json!({
                    "query": {"type": "string", "description": "Search query"},
                    "resources": {
                        "type": "array",
                        "description": "Resources to search in",
                        "items": {
                            "type": "string",
                            "enum": ["matters", "contacts", "documents", "tasks"]
                        },
                        "default": DEFAULT_SEARCH_RESOURCES,
                    },
                    "limit": {
                        "type": "number",
                        "description": "Number of results per resource (default: 5)",
                        "default": 5
                    },
                }),
                &["query"],
            ),
            FirmTool::Search,
        ),
    ]
}

/// Queries each resource in turn. A failing resource contributes
/// `{error: message}` under its key instead of failing the whole search.
async fn search(ctx: &ToolContext, args: &Value) -> Result<Value, ToolError> {
    let query = ensure_string(args, "query")?;
    let limit = limit_or(args, "limit", 5);
    let resources: Vec<String> = match optional_array(args, "resources")? {
        Some(items) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        None => DEFAULT_SEARCH_RESOURCES
            .iter()
            .map(|r| r.to_string())
            .collect(),
    };

    let mut results = Map::new();
    for resource in resources {
        let request = ApiRequest::get(format!("/{}", resource))
            .query("query", &query)
            .query("limit", limit);
        let outcome = match ctx.call(request).await {
            Ok(response) => response
                .get("data")
                .filter(|data| !data.is_null())
                .cloned()
                .unwrap_or_else(|| json!([])),
            Err(err) => {
                ctx.logger.warn(
                    "Search resource failed",
                    Some(&json!({"resource": resource, "error": err.to_string()})),
                );
                json!({"error": err.to_string()})
            }
        };
        results.insert(resource, outcome);
    }
    Ok(Value::Object(results))
}

#[async_trait]
impl ToolHandler for FirmTool {
    async fn handle(&self, ctx: &ToolContext, args: Value) -> Result<Value, ToolError> {
        match self {
            FirmTool::GetBills => {
                let request = ApiRequest::get("/bills")
                    .query("limit", limit_or(&args, "limit", 10))
                    .query_opt("status", optional_string(&args, "status")?);
                ctx.call(request).await
            }
            FirmTool::GetTimelineEvents => {
                let request = ApiRequest::get("/timeline_events")
                    .query("matter_id", ensure_id(&args, "matter_id")?)
                    .query("limit", limit_or(&args, "limit", 20));
                ctx.call(request).await
            }
            FirmTool::GetCustomFields => {
                let request = ApiRequest::get("/custom_fields")
                    .query_opt("parent_type", optional_string(&args, "parent_type")?);
                ctx.call(request).await
            }
            FirmTool::CreateWebhook => {
                let mut data = json!({
                    "url": ensure_string(&args, "url")?,
                    "events": ensure_array(&args, "events")?,
                });
                if let Some(secret) = optional_string(&args, "secret")? {
                    data["secret"] = Value::String(secret);
                }
                ctx.call(ApiRequest::post("/webhooks").body(json!({"data": data})))
                    .await
            }
            FirmTool::GetWebhooks => ctx.call(ApiRequest::get("/webhooks")).await,
            FirmTool::GetUsers => {
                let request = ApiRequest::get("/users")
                    .query("limit", limit_or(&args, "limit", 10))
                    .query_opt("enabled", optional_bool(&args, "enabled"));
                ctx.call(request).await
            }
            FirmTool::GetCurrentUser => ctx.call(ApiRequest::get("/users/who_am_i")).await,
            FirmTool::GetTrustAccounts => {
                let request =
                    ApiRequest::get("/trust_accounts").query("limit", limit_or(&args, "limit", 10));
                ctx.call(request).await
            }
            FirmTool::GetAllocations => {
                let request = ApiRequest::get("/allocations")
                    .query("limit", limit_or(&args, "limit", 10))
                    .query_opt("matter_id", optional_id(&args, "matter_id")?);
                ctx.call(request).await
            }
            FirmTool::Search => search(ctx, &args).await,
        }
    }
}
