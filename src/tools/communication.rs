use async_trait::async_trait;
use serde_json::{json, Value};

use crate::errors::ToolError;
use crate::services::dispatcher::ToolContext;
use crate::services::registry::{ToolDefinition, ToolHandler};
use crate::services::request::ApiRequest;
use crate::services::validation::{
    ensure_id, ensure_string, id_value, limit_or, optional_bool, optional_string, string_or,
};
use crate::tools::{api_schema, define, id_property};

#[derive(Debug, Clone, Copy)]
pub enum CommunicationTool {
    GetContactEmails,
    GetContactPhones,
    AddContactEmail,
    AddContactPhone,
    GetContactCommunications,
    LogCommunication,
}

pub fn catalog() -> Vec<ToolDefinition> {
    vec![
        define(
            "get_contact_emails",
            "Get all email addresses for a contact",
            api_schema(json!({"contact_id": id_property("Contact ID")}), &["contact_id"]),
            CommunicationTool::GetContactEmails,
        ),
        define(
            "get_contact_phones",
            "Get all phone numbers for a contact",
            api_schema(json!({"contact_id": id_property("Contact ID")}), &["contact_id"]),
            CommunicationTool::GetContactPhones,
        ),
        define(
            "add_contact_email",
            "Add a new email address to a contact",
            api_schema(
                json!({
                    "contact_id": id_property("Contact ID"),
                    "address": {"type": "string", "description": "Email address"},
                    "name": {
                        "type": "string",
                        "description": "Label for this email (e.g., \"Work\", \"Personal\")",
                        "default": "Work"
                    },
                    "default_email": {
                        "type": "boolean",
                        "description": "Set as default email",
                        "default": false
                    },
                }),
                &["contact_id", "address"],
            ),
            CommunicationTool::AddContactEmail,
        ),
        define(
            "add_contact_phone",
            "Add a new phone number to a contact",
            api_schema(
                json!({
                    "contact_id": id_property("Contact ID"),
                    "number": {"type": "string", "description": "Phone number"},
                    "name": {
                        "type": "string",
                        "description": "Label for this phone (e.g., \"Mobile\", \"Office\")",
                        "default": "Mobile"
                    },
                    "default_number": {
                        "type": "boolean",
                        "description": "Set as default phone",
                        "default": false
                    },
                }),
                &["contact_id", "number"],
            ),
            CommunicationTool::AddContactPhone,
        ),
        define(
            "get_contact_communications",
            "Get communication history for a contact",
            api_schema(
                json!({
                    "contact_id": id_property("Contact ID"),
                    "type": {
                        "type": "string",
                        "description": "Filter by communication type",
                        "enum": ["email", "phone", "meeting", "letter", "all"],
                        "default": "all"
                    },
                    "limit": {
                        "type": "number",
                        "description": "Number of communications to retrieve",
                        "default": 20
                    },
                }),
                &["contact_id"],
            ),
            CommunicationTool::GetContactCommunications,
        ),
        define(
            "log_communication",
            "Log a communication with a contact",
            api_schema(
                json!({
                    "contact_id": id_property("Contact ID"),
                    "matter_id": id_property("Matter ID (optional)"),
                    "type": {
                        "type": "string",
                        "description": "Communication type",
                        "enum": ["email", "phone_call", "meeting", "letter"]
                    },
                    "subject": {"type": "string", "description": "Subject/summary of communication"},
                    "body": {"type": "string", "description": "Details of the communication"},
                    "date": {"type": "string", "description": "Date of communication (YYYY-MM-DD)"},
                    "duration": {
                        "type": "number",
                        "description": "Duration in minutes (for calls/meetings)"
                    },
                }),
                &["contact_id", "type", "subject"],
            ),
            CommunicationTool::LogCommunication,
        ),
    ]
}

fn today() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}

#[async_trait]
impl ToolHandler for CommunicationTool {
    async fn handle(&self, ctx: &ToolContext, args: Value) -> Result<Value, ToolError> {
        match self {
            CommunicationTool::GetContactEmails => {
                let contact_id = ensure_id(&args, "contact_id")?;
                ctx.call(ApiRequest::get(format!(
                    "/contacts/{}/email_addresses",
                    contact_id
                )))
                .await
            }
            CommunicationTool::GetContactPhones => {
                let contact_id = ensure_id(&args, "contact_id")?;
                ctx.call(ApiRequest::get(format!(
                    "/contacts/{}/phone_numbers",
                    contact_id
                )))
                .await
            }
            CommunicationTool::AddContactEmail => {
                let contact_id = ensure_id(&args, "contact_id")?;
                let body = json!({
                    "data": {
                        "address": ensure_string(&args, "address")?,
                        "name": string_or(&args, "name", "Work")?,
                        "default_email": optional_bool(&args, "default_email").unwrap_or(false),
                    }
                });
                ctx.call(
                    ApiRequest::post(format!("/contacts/{}/email_addresses", contact_id))
                        .body(body),
                )
                .await
            }
            CommunicationTool::AddContactPhone => {
                let contact_id = ensure_id(&args, "contact_id")?;
                let body = json!({
                    "data": {
                        "number": ensure_string(&args, "number")?,
                        "name": string_or(&args, "name", "Mobile")?,
                        "default_number": optional_bool(&args, "default_number").unwrap_or(false),
                    }
                });
                ctx.call(
                    ApiRequest::post(format!("/contacts/{}/phone_numbers", contact_id)).body(body),
                )
                .await
            }
            CommunicationTool::GetContactCommunications => {
                let kind = optional_string(&args, "type")?.filter(|kind| kind != "all");
                let request = ApiRequest::get("/communications")
                    .query("contact_id", ensure_id(&args, "contact_id")?)
                    .query("limit", limit_or(&args, "limit", 20))
                    .query_opt("type", kind);
                ctx.call(request).await
            }
            CommunicationTool::LogCommunication => {
                let mut data = json!({
                    "contact": {"id": id_value(&args, "contact_id")},
                    "type": ensure_string(&args, "type")?,
                    "subject": ensure_string(&args, "subject")?,
                    "date": optional_string(&args, "date")?.unwrap_or_else(today),
                });
                if let Some(body) = optional_string(&args, "body")? {
                    data["body"] = Value::String(body);
                }
                if let Some(matter_id) = id_value(&args, "matter_id") {
                    data["matter"] = json!({"id": matter_id});
                }
                if let Some(duration) = args
                    .get("duration")
                    .filter(|d| d.as_f64().map(|n| n != 0.0).unwrap_or(false))
                {
                    data["duration"] = duration.clone();
                }
                ctx.call(ApiRequest::post("/communications").body(json!({"data": data})))
                    .await
            }
        }
    }
}
