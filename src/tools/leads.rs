use async_trait::async_trait;
use chrono::SecondsFormat;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::errors::ToolError;
use crate::services::dispatcher::ToolContext;
use crate::services::pipeline::{decode, step};
use crate::services::registry::{ToolDefinition, ToolHandler};
use crate::services::request::ApiRequest;
use crate::services::validation::{
    ensure_id, ensure_string, id_value, limit_or, optional_id, optional_object, optional_string,
    string_or,
};
use crate::tools::{api_schema, define, id_property};

const LEAD_STATUSES: [&str; 5] = ["new", "contacted", "qualified", "converted", "rejected"];

/// Lead inbox tools. Everything except contact and matter creation during
/// conversion is served from the Grow base URL.
#[derive(Debug, Clone, Copy)]
pub enum LeadTool {
    SubmitLead,
    GetLeads,
    UpdateLeadStatus,
    ConvertLeadToMatter,
    GetLeadAnalytics,
}

pub fn catalog() -> Vec<ToolDefinition> {
    vec![
        define(
            "submit_lead",
            "Submit a new lead to Clio Grow lead inbox",
            api_schema(
                json!({
                    "first_name": {"type": "string", "description": "Lead first name"},
                    "last_name": {"type": "string", "description": "Lead last name"},
                    "email": {"type": "string", "description": "Lead email address"},
                    "phone": {"type": "string", "description": "Lead phone number"},
                    "practice_area": {"type": "string", "description": "Legal practice area"},
                    "referral_source": {"type": "string", "description": "How the lead found the firm"},
                    "message": {"type": "string", "description": "Lead message or inquiry"},
                    "urgency": {
                        "type": "string",
                        "description": "Urgency level",
                        "enum": ["low", "medium", "high", "urgent"],
                        "default": "medium"
                    },
                    "custom_fields": {"type": "object", "description": "Additional custom lead data"},
                }),
                &["first_name", "last_name", "email"],
            ),
            LeadTool::SubmitLead,
        ),
        define(
            "get_leads",
            "Get leads from Clio Grow",
            api_schema(
                json!({
                    "status": {
                        "type": "string",
                        "description": "Filter by lead status",
                        "enum": LEAD_STATUSES
                    },
                    "assigned_to": id_property("Filter by assigned user ID"),
                    "practice_area": {"type": "string", "description": "Filter by practice area"},
                    "date_from": {"type": "string", "description": "Filter leads from date (YYYY-MM-DD)"},
                    "date_to": {"type": "string", "description": "Filter leads to date (YYYY-MM-DD)"},
                    "limit": {"type": "number", "description": "Number of leads to retrieve", "default": 20},
                }),
                &[],
            ),
            LeadTool::GetLeads,
        ),
        define(
            "update_lead_status",
            "Update the status of a lead",
            api_schema(
                json!({
                    "lead_id": id_property("Lead ID"),
                    "status": {"type": "string", "description": "New status", "enum": LEAD_STATUSES},
                    "notes": {"type": "string", "description": "Notes about the status change"},
                    "assigned_to": id_property("User ID to assign lead to"),
                }),
                &["lead_id", "status"],
            ),
            LeadTool::UpdateLeadStatus,
        ),
        define(
            "convert_lead_to_matter",
            "Convert a qualified lead to a matter and contact",
            api_schema(
                json!({
                    "lead_id": id_property("Lead ID to convert"),
                    "matter_description": {"type": "string", "description": "Description for the new matter"},
                    "practice_area_id": id_property("Practice area ID for the matter"),
                    "responsible_attorney_id": id_property("Attorney user ID"),
                    "billing_rate": {"type": "number", "description": "Billing rate for the matter"},
                    "create_retainer": {
                        "type": "boolean",
                        "description": "Create retainer agreement",
                        "default": false
                    },
                }),
                &["lead_id", "matter_description"],
            ),
            LeadTool::ConvertLeadToMatter,
        ),
        define(
            "get_lead_analytics",
            "Get lead conversion analytics",
            api_schema(
                json!({
                    "date_from": {"type": "string", "description": "Start date for analytics (YYYY-MM-DD)"},
                    "date_to": {"type": "string", "description": "End date for analytics (YYYY-MM-DD)"},
                    "group_by": {
                        "type": "string",
                        "description": "Group analytics by",
                        "enum": ["source", "practice_area", "assigned_user", "status"],
                        "default": "source"
                    },
                }),
                &["date_from", "date_to"],
            ),
            LeadTool::GetLeadAnalytics,
        ),
    ]
}

fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn insert_opt(data: &mut Map<String, Value>, key: &str, value: Option<String>) {
    if let Some(value) = value {
        data.insert(key.to_string(), Value::String(value));
    }
}

async fn update_lead(
    ctx: &ToolContext,
    lead_id: &str,
    status: String,
    notes: Option<String>,
    assigned_to: Option<Value>,
) -> Result<Value, ToolError> {
    let mut data = Map::new();
    data.insert("status".to_string(), Value::String(status));
    insert_opt(&mut data, "notes", notes);
    data.insert("updated_at".to_string(), Value::String(now_iso()));
    if let Some(user_id) = assigned_to {
        data.insert("assigned_to".to_string(), json!({"id": user_id}));
    }
    ctx.call(
        ApiRequest::patch(format!("/leads/{}", lead_id))
            .body(json!({"data": data}))
            .grow(),
    )
    .await
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct Lead {
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    phone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedRecord {
    id: Value,
    #[serde(default)]
    display_number: Option<Value>,
}

fn record_data(name: &str, response: Value) -> Result<(Value, CreatedRecord), ToolError> {
    let data = response.get("data").cloned().unwrap_or(Value::Null);
    let record = decode(name, data.clone())?;
    Ok((data, record))
}

/// fetch lead, create contact, create matter, mark lead converted. Each
/// stage needs the previous one's output, so they run strictly in order.
async fn convert_lead(ctx: &ToolContext, args: &Value) -> Result<Value, ToolError> {
    let lead_id = ensure_id(args, "lead_id")?;
    let description = ensure_string(args, "matter_description")?;

    let lead: Envelope<Lead> = step("fetch_lead", async {
        let response = ctx
            .call(ApiRequest::get(format!("/leads/{}", lead_id)).grow())
            .await?;
        decode("fetch_lead", response)
    })
    .await?;
    let lead = lead.data;

    let (contact, contact_record) = step("create_contact", async {
        let phone_numbers = match &lead.phone {
            Some(phone) if !phone.is_empty() => json!([
                {"number": phone, "name": "Primary", "default_number": true}
            ]),
            _ => json!([]),
        };
        let body = json!({
            "data": {
                "type": "Person",
                "first_name": lead.first_name,
                "last_name": lead.last_name,
                "email_addresses": [
                    {"address": lead.email, "name": "Primary", "default_email": true}
                ],
                "phone_numbers": phone_numbers,
            }
        });
        let response = ctx.call(ApiRequest::post("/contacts").body(body)).await?;
        record_data("create_contact", response)
    })
    .await?;

    let (matter, matter_record) = step("create_matter", async {
        let billing_rate = args.get("billing_rate").filter(|rate| {
            rate.as_f64().map(|n| n != 0.0).unwrap_or(false)
        });
        let mut data = Map::new();
        data.insert("description".to_string(), Value::String(description));
        data.insert("client".to_string(), json!({"id": contact_record.id}));
        data.insert(
            "practice_area".to_string(),
            id_value(args, "practice_area_id")
                .map(|id| json!({"id": id}))
                .unwrap_or(Value::Null),
        );
        data.insert(
            "responsible_attorney".to_string(),
            id_value(args, "responsible_attorney_id")
                .map(|id| json!({"id": id}))
                .unwrap_or(Value::Null),
        );
        data.insert(
            "billing_method".to_string(),
            Value::String(if billing_rate.is_some() { "hourly" } else { "flat_fee" }.to_string()),
        );
        if let Some(rate) = billing_rate {
            data.insert("hourly_rate".to_string(), rate.clone());
        }
        data.insert("status".to_string(), Value::String("open".to_string()));

        let response = ctx
            .call(ApiRequest::post("/matters").body(json!({"data": data})))
            .await?;
        record_data("create_matter", response)
    })
    .await?;

    let display_number = match &matter_record.display_number {
        Some(Value::String(text)) => text.clone(),
        Some(other) if !other.is_null() => other.to_string(),
        _ => match &matter_record.id {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        },
    };
    step(
        "mark_lead_converted",
        update_lead(
            ctx,
            &lead_id,
            "converted".to_string(),
            Some(format!("Converted to matter {}", display_number)),
            None,
        ),
    )
    .await?;

    ctx.logger.info(
        "Lead converted",
        Some(&json!({"lead_id": lead_id, "matter": display_number})),
    );
    Ok(json!({
        "contact": contact,
        "matter": matter,
        "lead_converted": true,
    }))
}

#[async_trait]
impl ToolHandler for LeadTool {
    async fn handle(&self, ctx: &ToolContext, args: Value) -> Result<Value, ToolError> {
        match self {
            LeadTool::SubmitLead => {
                let mut data = Map::new();
                data.insert(
                    "first_name".to_string(),
                    Value::String(ensure_string(&args, "first_name")?),
                );
                data.insert(
                    "last_name".to_string(),
                    Value::String(ensure_string(&args, "last_name")?),
                );
                data.insert(
                    "email".to_string(),
                    Value::String(ensure_string(&args, "email")?),
                );
                for key in ["phone", "practice_area", "referral_source", "message"] {
                    insert_opt(&mut data, key, optional_string(&args, key)?);
                }
                data.insert(
                    "urgency".to_string(),
                    Value::String(string_or(&args, "urgency", "medium")?),
                );
                data.insert(
                    "custom_fields".to_string(),
                    optional_object(&args, "custom_fields").unwrap_or_else(|| json!({})),
                );
                data.insert("submitted_at".to_string(), Value::String(now_iso()));
                ctx.call(
                    ApiRequest::post("/leads")
                        .body(json!({"data": data}))
                        .grow(),
                )
                .await
            }
            LeadTool::GetLeads => {
                let request = ApiRequest::get("/leads")
                    .query("limit", limit_or(&args, "limit", 20))
                    .query_opt("status", optional_string(&args, "status")?)
                    .query_opt("assigned_to", optional_id(&args, "assigned_to")?)
                    .query_opt("practice_area", optional_string(&args, "practice_area")?)
                    .query_opt("date_from", optional_string(&args, "date_from")?)
                    .query_opt("date_to", optional_string(&args, "date_to")?)
                    .grow();
                ctx.call(request).await
            }
            LeadTool::UpdateLeadStatus => {
                let lead_id = ensure_id(&args, "lead_id")?;
                update_lead(
                    ctx,
                    &lead_id,
                    ensure_string(&args, "status")?,
                    optional_string(&args, "notes")?,
                    id_value(&args, "assigned_to"),
                )
                .await
            }
            LeadTool::ConvertLeadToMatter => convert_lead(ctx, &args).await,
            LeadTool::GetLeadAnalytics => {
                let request = ApiRequest::get("/leads/analytics")
                    .query("date_from", ensure_string(&args, "date_from")?)
                    .query("date_to", ensure_string(&args, "date_to")?)
                    .query("group_by", string_or(&args, "group_by", "source")?)
                    .grow();
                ctx.call(request).await
            }
        }
    }
}
