use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::errors::ToolError;
use crate::services::dispatcher::ToolContext;
use crate::services::pipeline::step;
use crate::services::registry::{ToolDefinition, ToolHandler};
use crate::services::request::ApiRequest;
use crate::services::validation::{
    ensure_array, ensure_id, ensure_string, id_value, limit_or, optional_array, optional_bool,
    optional_id, optional_object, optional_string, string_or,
};
use crate::tools::{api_schema, define, id_property};

const MATTER_MERGE_FIELDS: &str = "id,display_number,description,\
client{name,first_name,last_name,email,phone_numbers,addresses},\
custom_field_values{field_name,value}";
const CONTACT_MERGE_FIELDS: &str =
    "id,name,first_name,last_name,email_addresses,phone_numbers,addresses";

#[derive(Debug, Clone, Copy)]
pub enum DocumentTool {
    ListDocumentTemplates,
    CreateDocumentFromTemplate,
    GetDocumentContent,
    UploadDocumentTemplate,
    BatchCreateDocuments,
    SendDocumentForSignature,
    GetSignatureStatus,
    GetCourtForms,
    FillCourtForm,
}

pub fn catalog() -> Vec<ToolDefinition> {
    vec![
        define(
            "list_document_templates",
            "List available document templates",
            api_schema(
                json!({
                    "category": {"type": "string", "description": "Filter templates by category"},
                    "limit": {
                        "type": "number",
                        "description": "Number of templates to retrieve (default: 20)",
                        "default": 20
                    },
                }),
                &[],
            ),
            DocumentTool::ListDocumentTemplates,
        ),
        define(
            "create_document_from_template",
            "Create a new document from a template with auto-populated data",
            api_schema(
                json!({
                    "template_id": id_property("Document template ID"),
                    "matter_id": id_property("Matter ID to pull data from"),
                    "contact_id": id_property("Contact ID to pull data from (optional)"),
                    "name": {"type": "string", "description": "Name for the generated document"},
                    "folder_id": id_property("Folder ID to store the document (optional)"),
                    "merge_fields": {
                        "type": "object",
                        "description": "Additional fields to merge into the document"
                    },
                }),
                &["template_id", "matter_id", "name"],
            ),
            DocumentTool::CreateDocumentFromTemplate,
        ),
        define(
            "get_document_content",
            "Get the content of a document",
            api_schema(
                json!({
                    "document_id": id_property("Document ID"),
                    "format": {
                        "type": "string",
                        "description": "Format to retrieve (pdf, docx, html)",
                        "enum": ["pdf", "docx", "html"],
                        "default": "pdf"
                    },
                }),
                &["document_id"],
            ),
            DocumentTool::GetDocumentContent,
        ),
        define(
            "upload_document_template",
            "Upload a new document template",
            api_schema(
                json!({
                    "name": {"type": "string", "description": "Template name"},
                    "category": {"type": "string", "description": "Template category"},
                    "content": {"type": "string", "description": "Template content (base64 encoded)"},
                    "content_type": {
                        "type": "string",
                        "description": "Content type (application/pdf, application/vnd.openxmlformats-officedocument.wordprocessingml.document)",
                        "enum": [
                            "application/pdf",
                            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
                        ]
                    },
                    "merge_fields": {
                        "type": "array",
                        "description": "List of merge field names in the template",
                        "items": {"type": "string"}
                    },
                }),
                &["name", "content", "content_type"],
            ),
            DocumentTool::UploadDocumentTemplate,
        ),
        define(
            "batch_create_documents",
            "Create multiple documents from templates in batch",
            api_schema(
                json!({
                    "documents": {
                        "type": "array",
                        "description": "Array of documents to create",
                        "items": {
                            "type": "object",
                            "properties": {
                                "template_id": id_property("Template ID"),
                                "matter_id": id_property("Matter ID"),
                                "name": {"type": "string", "description": "Document name"},
                                "merge_fields": {"type": "object", "description": "Fields to merge"}
                            },
                            "required": ["template_id", "matter_id", "name"]
                        }
                    },
                }),
                &["documents"],
            ),
            DocumentTool::BatchCreateDocuments,
        ),
        define(
            "send_document_for_signature",
            "Send a document for eSignature",
            api_schema(
                json!({
                    "document_id": id_property("Document ID to send for signature"),
                    "signers": {
                        "type": "array",
                        "description": "List of signers",
                        "items": {
                            "type": "object",
                            "properties": {
                                "email": {"type": "string", "description": "Signer email"},
                                "name": {"type": "string", "description": "Signer name"},
                                "role": {"type": "string", "description": "Signer role"}
                            },
                            "required": ["email", "name"]
                        }
                    },
                    "message": {
                        "type": "string",
                        "description": "Message to include with signature request"
                    },
                    "due_date": {
                        "type": "string",
                        "description": "Due date for signatures (YYYY-MM-DD)"
                    },
                }),
                &["document_id", "signers"],
            ),
            DocumentTool::SendDocumentForSignature,
        ),
        define(
            "get_signature_status",
            "Check the status of a signature request",
            api_schema(
                json!({"signature_request_id": id_property("Signature request ID")}),
                &["signature_request_id"],
            ),
            DocumentTool::GetSignatureStatus,
        ),
        define(
            "get_court_forms",
            "Get available court forms for a jurisdiction",
            api_schema(
                json!({
                    "jurisdiction": {
                        "type": "string",
                        "description": "Jurisdiction code (e.g., \"NY\", \"CA\")"
                    },
                    "court_type": {
                        "type": "string",
                        "description": "Type of court (federal, state, immigration)",
                        "enum": ["federal", "state", "immigration"]
                    },
                    "form_category": {"type": "string", "description": "Category of forms to retrieve"},
                    "search": {"type": "string", "description": "Search term for form names"},
                }),
                &["jurisdiction"],
            ),
            DocumentTool::GetCourtForms,
        ),
        define(
            "fill_court_form",
            "Fill a court form with matter and contact data",
            api_schema(
                json!({
                    "form_id": id_property("Court form ID"),
                    "matter_id": id_property("Matter ID to pull data from"),
                    "contact_id": id_property("Primary contact ID"),
                    "additional_data": {
                        "type": "object",
                        "description": "Additional data to fill in the form"
                    },
                    "save_to_matter": {
                        "type": "boolean",
                        "description": "Save completed form to matter documents",
                        "default": true
                    },
                }),
                &["form_id", "matter_id"],
            ),
            DocumentTool::FillCourtForm,
        ),
    ]
}

fn matter_merge_request(matter_id: &str) -> ApiRequest {
    ApiRequest::get(format!("/matters/{}", matter_id)).query("fields", MATTER_MERGE_FIELDS)
}

fn data_of(response: Value) -> Value {
    match response {
        Value::Object(mut map) => map.remove("data").unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

/// Fetches the matter and, when given, the contact concurrently; both are
/// merged into the template before the document is created.
async fn create_from_template(ctx: &ToolContext, args: &Value) -> Result<Value, ToolError> {
    let matter_id = ensure_id(args, "matter_id")?;
    let contact_id = optional_id(args, "contact_id")?;
    let name = ensure_string(args, "name")?;

    let matter_fetch = ctx.call(matter_merge_request(&matter_id));
    let contact_fetch = async {
        match &contact_id {
            Some(id) => ctx
                .call(
                    ApiRequest::get(format!("/contacts/{}", id))
                        .query("fields", CONTACT_MERGE_FIELDS),
                )
                .await
                .map(Some),
            None => Ok(None),
        }
    };
    let (matter, contact) = step("fetch_merge_data", async {
        tokio::try_join!(matter_fetch, contact_fetch)
    })
    .await?;

    let mut merge_data = Map::new();
    merge_data.insert("matter".to_string(), data_of(matter));
    if let Some(contact) = contact {
        merge_data.insert("contact".to_string(), data_of(contact));
    }
    merge_data.insert(
        "custom".to_string(),
        optional_object(args, "merge_fields").unwrap_or_else(|| json!({})),
    );

    let mut data = json!({
        "document_template": {"id": id_value(args, "template_id")},
        "matter": {"id": id_value(args, "matter_id")},
        "name": name,
        "merge_data": merge_data,
    });
    if let Some(folder_id) = id_value(args, "folder_id") {
        data["folder"] = json!({"id": folder_id});
    }

    step(
        "create_document",
        ctx.call(ApiRequest::post("/documents").body(json!({"data": data}))),
    )
    .await
}

const BATCH_ITEM_FIELDS: [&str; 4] = ["template_id", "matter_id", "name", "merge_fields"];

/// Items are created one after another; each reports its own outcome.
/// Only the declared item fields are forwarded.
async fn batch_create(ctx: &ToolContext, args: &Value) -> Result<Value, ToolError> {
    let documents = ensure_array(args, "documents")?;
    let mut results = Vec::with_capacity(documents.len());
    for document in documents {
        let name = document.get("name").cloned().unwrap_or(Value::Null);
        let item: Map<String, Value> = BATCH_ITEM_FIELDS
            .iter()
            .filter_map(|key| document.get(*key).map(|value| (key.to_string(), value.clone())))
            .collect();
        let outcome = match create_from_template(ctx, &Value::Object(item)).await {
            Ok(created) => json!({
                "status": "success",
                "document": data_of(created),
                "name": name,
            }),
            Err(err) => json!({
                "status": "error",
                "error": err.to_string(),
                "name": name,
            }),
        };
        results.push(outcome);
    }
    Ok(json!({ "results": results }))
}

async fn fill_court_form(ctx: &ToolContext, args: &Value) -> Result<Value, ToolError> {
    let matter_id = ensure_id(args, "matter_id")?;
    let matter = step("fetch_matter", ctx.call(matter_merge_request(&matter_id))).await?;

    let mut field_mappings = match data_of(matter) {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    if let Some(Value::Object(extra)) = optional_object(args, "additional_data") {
        field_mappings.extend(extra);
    }

    let body = json!({
        "data": {
            "court_form": {"id": id_value(args, "form_id")},
            "matter": {"id": id_value(args, "matter_id")},
            "contact": id_value(args, "contact_id").map(|id| json!({"id": id})),
            "field_mappings": field_mappings,
            "save_to_matter": optional_bool(args, "save_to_matter") != Some(false),
        }
    });
    step(
        "submit_form",
        ctx.call(ApiRequest::post("/court_form_submissions").body(body)),
    )
    .await
}

#[async_trait]
impl ToolHandler for DocumentTool {
    async fn handle(&self, ctx: &ToolContext, args: Value) -> Result<Value, ToolError> {
        match self {
            DocumentTool::ListDocumentTemplates => {
                let request = ApiRequest::get("/document_templates")
                    .query("limit", limit_or(&args, "limit", 20))
                    .query_opt("category", optional_string(&args, "category")?);
                ctx.call(request).await
            }
            DocumentTool::CreateDocumentFromTemplate => create_from_template(ctx, &args).await,
            DocumentTool::GetDocumentContent => {
                let document_id = ensure_id(&args, "document_id")?;
                let request = ApiRequest::get(format!("/documents/{}/download", document_id))
                    .query("format", string_or(&args, "format", "pdf")?);
                ctx.call(request).await
            }
            DocumentTool::UploadDocumentTemplate => {
                let merge_fields = optional_array(&args, "merge_fields")?
                    .cloned()
                    .unwrap_or_default();
                let body = json!({
                    "data": {
                        "name": ensure_string(&args, "name")?,
                        "content": ensure_string(&args, "content")?,
                        "content_type": ensure_string(&args, "content_type")?,
                        "category": string_or(&args, "category", "Custom")?,
                        "merge_fields": merge_fields,
                    }
                });
                ctx.call(ApiRequest::post("/document_templates").body(body))
                    .await
            }
            DocumentTool::BatchCreateDocuments => batch_create(ctx, &args).await,
            DocumentTool::SendDocumentForSignature => {
                let mut data = json!({
                    "document": {"id": id_value(&args, "document_id")},
                    "signers": ensure_array(&args, "signers")?,
                    "message": string_or(&args, "message", "Please sign this document.")?,
                });
                if let Some(due_date) = optional_string(&args, "due_date")? {
                    data["due_date"] = Value::String(due_date);
                }
                ctx.call(ApiRequest::post("/signature_requests").body(json!({"data": data})))
                    .await
            }
            DocumentTool::GetSignatureStatus => {
                let request_id = ensure_id(&args, "signature_request_id")?;
                ctx.call(ApiRequest::get(format!("/signature_requests/{}", request_id)))
                    .await
            }
            DocumentTool::GetCourtForms => {
                let request = ApiRequest::get("/court_forms")
                    .query("jurisdiction", ensure_string(&args, "jurisdiction")?)
                    .query_opt("court_type", optional_string(&args, "court_type")?)
                    .query_opt("category", optional_string(&args, "form_category")?)
                    .query_opt("search", optional_string(&args, "search")?);
                ctx.call(request).await
            }
            DocumentTool::FillCourtForm => fill_court_form(ctx, &args).await,
        }
    }
}
