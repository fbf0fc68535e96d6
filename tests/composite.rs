mod common;
use common::{dispatcher, json_of, RecordingTransport};

use clio_mcp::errors::ToolError;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn lead_reply() -> serde_json::Value {
    json!({"data": {
        "id": 7,
        "first_name": "Ada",
        "last_name": "Lovelace",
        "email": "ada@example.com",
        "phone": "555-0100"
    }})
}

#[tokio::test]
async fn lead_conversion_runs_every_step_in_order() {
    let transport = Arc::new(
        RecordingTransport::new()
            .reply("GET", "/leads/7", Ok(lead_reply()))
            .reply("POST", "/contacts", Ok(json!({"data": {"id": 101}})))
            .reply(
                "POST",
                "/matters",
                Ok(json!({"data": {"id": 202, "display_number": "00042-Lovelace"}})),
            )
            .reply("PATCH", "/leads/7", Ok(json!({"data": {"id": 7}}))),
    );
    let dispatcher = dispatcher(transport.clone(), Some("A"));

    let body = json_of(
        &dispatcher
            .dispatch(
                "convert_lead_to_matter",
                json!({"lead_id": 7, "matter_description": "Estate plan", "billing_rate": 300}),
            )
            .await,
    );
    assert_eq!(body["lead_converted"], true);
    assert_eq!(body["contact"]["id"], 101);
    assert_eq!(body["matter"]["display_number"], "00042-Lovelace");

    assert_eq!(
        transport.keys(),
        vec!["GET /leads/7", "POST /contacts", "POST /matters", "PATCH /leads/7"]
    );
    let calls = transport.calls();
    assert_eq!(calls[0].base, "https://grow.clio.com/api/v1");
    assert_eq!(calls[1].base, "https://app.clio.com/api/v4");
    assert_eq!(calls[3].base, "https://grow.clio.com/api/v1");

    let contact = calls[1].request.body.clone().expect("contact body");
    assert_eq!(contact["data"]["type"], "Person");
    assert_eq!(
        contact["data"]["email_addresses"][0]["address"],
        "ada@example.com"
    );
    assert_eq!(contact["data"]["phone_numbers"][0]["number"], "555-0100");

    let matter = calls[2].request.body.clone().expect("matter body");
    assert_eq!(matter["data"]["client"], json!({"id": 101}));
    assert_eq!(matter["data"]["billing_method"], "hourly");
    assert_eq!(matter["data"]["hourly_rate"], 300);
    assert_eq!(matter["data"]["practice_area"], serde_json::Value::Null);

    let mark = calls[3].request.body.clone().expect("mark body");
    assert_eq!(mark["data"]["status"], "converted");
    assert_eq!(mark["data"]["notes"], "Converted to matter 00042-Lovelace");
}

#[tokio::test]
async fn failed_step_is_named_and_stops_the_pipeline() {
    let transport = Arc::new(
        RecordingTransport::new()
            .reply("GET", "/leads/7", Ok(lead_reply()))
            .reply("POST", "/contacts", Ok(json!({"data": {"id": 101}})))
            .reply(
                "POST",
                "/matters",
                Err(ToolError::backend(422, "Practice area is invalid")),
            ),
    );
    let dispatcher = dispatcher(transport.clone(), Some("A"));

    let result = dispatcher
        .dispatch(
            "convert_lead_to_matter",
            json!({"lead_id": "7", "matter_description": "Estate plan"}),
        )
        .await;
    assert!(result.is_error());
    assert_eq!(
        result.text(),
        "Error: API Error: 422 - Practice area is invalid (step: create_matter)"
    );
    assert!(!transport.keys().contains(&"PATCH /leads/7".to_string()));
}

#[tokio::test]
async fn document_merge_data_is_fetched_concurrently() {
    let transport = Arc::new(
        RecordingTransport::new()
            .rendezvous(&["GET /matters/5", "GET /contacts/8"])
            .reply("GET", "/matters/5", Ok(json!({"data": {"id": 5, "display_number": "M-5"}})))
            .reply("GET", "/contacts/8", Ok(json!({"data": {"id": 8, "name": "Grace"}})))
            .reply("POST", "/documents", Ok(json!({"data": {"id": 77}}))),
    );
    let dispatcher = dispatcher(transport.clone(), Some("A"));

    // Sequential fetches would never get past the rendezvous.
    let result = tokio::time::timeout(
        Duration::from_secs(5),
        dispatcher.dispatch(
            "create_document_from_template",
            json!({
                "template_id": 3,
                "matter_id": 5,
                "contact_id": 8,
                "name": "Engagement letter",
                "merge_fields": {"fee": "flat"}
            }),
        ),
    )
    .await
    .expect("fetches must overlap");
    assert_eq!(json_of(&result)["data"]["id"], 77);

    let calls = transport.calls();
    assert_eq!(calls.last().map(|c| c.key()).as_deref(), Some("POST /documents"));
    let body = calls[2].request.body.clone().expect("document body");
    assert_eq!(body["data"]["document_template"], json!({"id": 3}));
    assert_eq!(body["data"]["merge_data"]["matter"]["display_number"], "M-5");
    assert_eq!(body["data"]["merge_data"]["contact"]["name"], "Grace");
    assert_eq!(body["data"]["merge_data"]["custom"], json!({"fee": "flat"}));
    assert!(body["data"].get("folder").is_none());
}

#[tokio::test]
async fn document_without_contact_skips_the_contact_fetch() {
    let transport = Arc::new(
        RecordingTransport::new().reply("GET", "/matters/5", Ok(json!({"data": {"id": 5}}))),
    );
    let dispatcher = dispatcher(transport.clone(), Some("A"));

    dispatcher
        .dispatch(
            "create_document_from_template",
            json!({"template_id": 3, "matter_id": 5, "name": "Letter", "folder_id": 12}),
        )
        .await;
    assert_eq!(transport.keys(), vec!["GET /matters/5", "POST /documents"]);
    let body = transport.calls()[1].request.body.clone().expect("body");
    assert!(body["data"]["merge_data"].get("contact").is_none());
    assert_eq!(body["data"]["merge_data"]["custom"], json!({}));
    assert_eq!(body["data"]["folder"], json!({"id": 12}));
}

#[tokio::test]
async fn batch_documents_report_each_item() {
    let transport = Arc::new(
        RecordingTransport::new()
            .reply("GET", "/matters/1", Ok(json!({"data": {"id": 1}})))
            .reply("POST", "/documents", Ok(json!({"data": {"id": 500}})))
            .reply("GET", "/matters/2", Err(ToolError::backend(404, "Not found"))),
    );
    let dispatcher = dispatcher(transport, Some("A"));

    let body = json_of(
        &dispatcher
            .dispatch(
                "batch_create_documents",
                json!({"documents": [
                    {"template_id": 3, "matter_id": 1, "name": "One"},
                    {"template_id": 3, "matter_id": 2, "name": "Two"}
                ]}),
            )
            .await,
    );
    let results = body["results"].as_array().expect("results");
    assert_eq!(results[0]["status"], "success");
    assert_eq!(results[0]["document"], json!({"id": 500}));
    assert_eq!(results[1]["status"], "error");
    assert_eq!(results[1]["name"], "Two");
    assert!(results[1]["error"]
        .as_str()
        .unwrap_or_default()
        .starts_with("API Error: 404 - Not found"));
}

#[tokio::test]
async fn bulk_custom_fields_update_create_and_report_missing() {
    let transport = Arc::new(
        RecordingTransport::new()
            .reply(
                "GET",
                "/matters/9",
                Ok(json!({"data": {"custom_field_values": [
                    {"id": 41, "field_name": "Court", "value": "old"}
                ]}})),
            )
            .reply(
                "PATCH",
                "/custom_field_values/41",
                Ok(json!({"data": {"value": "Superior"}})),
            )
            .reply(
                "GET",
                "/custom_fields",
                Ok(json!({"data": [{"id": 3, "name": "Judge"}]})),
            )
            .reply(
                "POST",
                "/custom_field_values",
                Ok(json!({"data": {"value": "Wapner"}})),
            ),
    );
    let dispatcher = dispatcher(transport.clone(), Some("A"));

    let body = json_of(
        &dispatcher
            .dispatch(
                "bulk_update_custom_fields",
                json!({"matter_id": 9, "updates": [
                    {"field_name": "Court", "value": "Superior"},
                    {"field_name": "Judge", "value": "Wapner"},
                    {"field_name": "Venue", "value": "Nowhere"}
                ]}),
            )
            .await,
    );
    let results = body["results"].as_array().expect("results");
    assert_eq!(results[0]["status"], "updated");
    assert_eq!(results[1]["status"], "created");
    assert_eq!(results[1]["value"], "Wapner");
    assert_eq!(results[2]["status"], "error");
    assert_eq!(results[2]["error"], "Custom field not found");

    // Definitions are looked up once even though two fields needed them.
    let keys = transport.keys();
    assert_eq!(keys.iter().filter(|k| *k == "GET /custom_fields").count(), 1);
    let create = transport
        .calls()
        .into_iter()
        .find(|c| c.key() == "POST /custom_field_values")
        .and_then(|c| c.request.body)
        .expect("create body");
    assert_eq!(create["data"]["custom_field"], json!({"id": 3}));
    assert_eq!(create["data"]["parent"], json!({"id": 9, "type": "Matter"}));
}

#[tokio::test]
async fn court_form_overlays_additional_data_on_matter_fields() {
    let transport = Arc::new(
        RecordingTransport::new()
            .reply(
                "GET",
                "/matters/4",
                Ok(json!({"data": {"id": 4, "description": "Old", "display_number": "M-4"}})),
            )
            .reply("POST", "/court_form_submissions", Ok(json!({"data": {"id": 1}}))),
    );
    let dispatcher = dispatcher(transport.clone(), Some("A"));

    dispatcher
        .dispatch(
            "fill_court_form",
            json!({"form_id": 2, "matter_id": 4, "additional_data": {"description": "New"}}),
        )
        .await;
    let body = transport.calls()[1].request.body.clone().expect("body");
    assert_eq!(body["data"]["field_mappings"]["description"], "New");
    assert_eq!(body["data"]["field_mappings"]["display_number"], "M-4");
    assert_eq!(body["data"]["contact"], serde_json::Value::Null);
    assert_eq!(body["data"]["save_to_matter"], true);
}

#[tokio::test]
async fn bad_field_name_fails_only_its_own_item() {
    let transport = Arc::new(
        RecordingTransport::new()
            .reply(
                "GET",
                "/matters/9",
                Ok(json!({"data": {"custom_field_values": [
                    {"id": 41, "field_name": "Court", "value": "old"}
                ]}})),
            )
            .reply(
                "PATCH",
                "/custom_field_values/41",
                Ok(json!({"data": {"value": "Superior"}})),
            ),
    );
    let dispatcher = dispatcher(transport.clone(), Some("A"));

    let result = dispatcher
        .dispatch(
            "bulk_update_custom_fields",
            json!({"matter_id": 9, "updates": [
                {"field_name": "Court", "value": "Superior"},
                {"field_name": "", "value": "x"}
            ]}),
        )
        .await;
    assert!(!result.is_error(), "{}", result.text());
    let body = json_of(&result);
    let results = body["results"].as_array().expect("results");
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["status"], "updated");
    assert_eq!(results[0]["value"], "Superior");
    assert_eq!(results[1]["status"], "error");
    assert_eq!(results[1]["error"], "field_name must be a non-empty string");
    assert_eq!(
        transport.keys(),
        vec!["GET /matters/9", "PATCH /custom_field_values/41"]
    );
}

#[tokio::test]
async fn batch_items_forward_only_declared_fields() {
    let transport = Arc::new(
        RecordingTransport::new()
            .reply("GET", "/matters/1", Ok(json!({"data": {"id": 1}})))
            .reply("POST", "/documents", Ok(json!({"data": {"id": 500}}))),
    );
    let dispatcher = dispatcher(transport.clone(), Some("A"));

    dispatcher
        .dispatch(
            "batch_create_documents",
            json!({"documents": [
                {"template_id": 3, "matter_id": 1, "name": "One", "contact_id": 8, "folder_id": 12}
            ]}),
        )
        .await;
    assert_eq!(transport.keys(), vec!["GET /matters/1", "POST /documents"]);
    let body = transport.calls()[1].request.body.clone().expect("body");
    assert!(body["data"].get("folder").is_none());
    assert!(body["data"]["merge_data"].get("contact").is_none());
}
