use async_trait::async_trait;
use serde_json::{json, Value};

use crate::errors::ToolError;
use crate::services::dispatcher::{render_output, ToolContext};
use crate::services::registry::{ToolDefinition, ToolHandler};
use crate::services::request::ApiRequest;
use crate::services::validation::{
    ensure_string, id_value, limit_or, optional_id, optional_string, string_or,
};
use crate::tools::{api_schema, define, id_property, limit_property};

/// Core practice-management listings and task creation.
#[derive(Debug, Clone, Copy)]
pub enum PracticeTool {
    GetMatters,
    GetContacts,
    GetActivities,
    GetTasks,
    CreateTask,
    GetCalendarEntries,
    GetDocuments,
}

pub fn catalog() -> Vec<ToolDefinition> {
    vec![
        define(
            "get_matters",
            "Get list of matters from Clio",
            api_schema(json!({"limit": limit_property("matters", 10)}), &[]),
            PracticeTool::GetMatters,
        ),
        define(
            "get_contacts",
            "Get list of contacts from Clio",
            api_schema(json!({"limit": limit_property("contacts", 10)}), &[]),
            PracticeTool::GetContacts,
        ),
        define(
            "get_activities",
            "Get list of activities/time entries from Clio",
            api_schema(json!({"limit": limit_property("activities", 10)}), &[]),
            PracticeTool::GetActivities,
        ),
        define(
            "get_tasks",
            "Get list of tasks from Clio",
            api_schema(json!({"limit": limit_property("tasks", 10)}), &[]),
            PracticeTool::GetTasks,
        ),
        define(
            "create_task",
            "Create a new task in Clio",
            api_schema(
                json!({
                    "name": {"type": "string", "description": "Task name"},
                    "due_date": {"type": "string", "description": "Due date (YYYY-MM-DD)"},
                    "priority": {
                        "type": "string",
                        "description": "Priority (low, normal, high)",
                        "enum": ["low", "normal", "high"],
                        "default": "normal"
                    },
                    "matter_id": id_property("Matter ID to associate with task"),
                }),
                &["name"],
            ),
            PracticeTool::CreateTask,
        ),
        define(
            "get_calendar_entries",
            "Get calendar entries from Clio",
            api_schema(
                json!({
                    "start_date": {"type": "string", "description": "Start date (YYYY-MM-DD)"},
                    "end_date": {"type": "string", "description": "End date (YYYY-MM-DD)"},
                }),
                &[],
            ),
            PracticeTool::GetCalendarEntries,
        ),
        define(
            "get_documents",
            "Get list of documents from Clio",
            api_schema(
                json!({
                    "matter_id": id_property("Filter by matter ID"),
                    "limit": limit_property("documents", 10),
                }),
                &[],
            ),
            PracticeTool::GetDocuments,
        ),
    ]
}

fn listing(resource: &str, args: &Value) -> ApiRequest {
    ApiRequest::get(format!("/{}", resource)).query("limit", limit_or(args, "limit", 10))
}

#[async_trait]
impl ToolHandler for PracticeTool {
    async fn handle(&self, ctx: &ToolContext, args: Value) -> Result<Value, ToolError> {
        match self {
            PracticeTool::GetMatters => ctx.call(listing("matters", &args)).await,
            PracticeTool::GetContacts => ctx.call(listing("contacts", &args)).await,
            PracticeTool::GetActivities => ctx.call(listing("activities", &args)).await,
            PracticeTool::GetTasks => ctx.call(listing("tasks", &args)).await,
            PracticeTool::CreateTask => {
                let mut data = json!({
                    "name": ensure_string(&args, "name")?,
                    "priority": string_or(&args, "priority", "normal")?,
                });
                if let Some(due) = optional_string(&args, "due_date")? {
                    data["due_at"] = Value::String(due);
                }
                if let Some(matter_id) = id_value(&args, "matter_id") {
                    data["matter"] = json!({"id": matter_id});
                }
                let created = ctx
                    .call(ApiRequest::post("/tasks").body(json!({"data": data})))
                    .await?;
                Ok(Value::String(format!(
                    "Task created successfully: {}",
                    render_output(created)
                )))
            }
            PracticeTool::GetCalendarEntries => {
                let request = ApiRequest::get("/calendar_entries")
                    .query("limit", 50)
                    .query_opt("start_date", optional_string(&args, "start_date")?)
                    .query_opt("end_date", optional_string(&args, "end_date")?);
                ctx.call(request).await
            }
            PracticeTool::GetDocuments => {
                let request = listing("documents", &args)
                    .query_opt("matter_id", optional_id(&args, "matter_id")?);
                ctx.call(request).await
            }
        }
    }
}
