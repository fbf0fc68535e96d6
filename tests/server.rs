mod common;
use common::{dispatcher, quiet_logger, RecordingTransport};

use clio_mcp::mcp::server::{McpServer, PROTOCOL_VERSION, SERVER_NAME};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::BufReader;

fn server() -> McpServer {
    McpServer::new(
        dispatcher(Arc::new(RecordingTransport::new()), Some("A")),
        quiet_logger(),
    )
}

async fn roundtrip(server: &McpServer, request: Value) -> Value {
    let line = server
        .handle_line(&request.to_string())
        .await
        .expect("reply expected");
    serde_json::from_str(&line).expect("reply is JSON")
}

#[tokio::test]
async fn initialize_reports_server_identity() {
    let server = server();
    let reply = roundtrip(
        &server,
        json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
    )
    .await;
    assert_eq!(reply["id"], 1);
    assert_eq!(reply["result"]["protocolVersion"], PROTOCOL_VERSION);
    assert_eq!(reply["result"]["serverInfo"]["name"], SERVER_NAME);
    assert!(reply["result"]["capabilities"]["tools"].is_object());
}

#[tokio::test]
async fn tools_list_exposes_the_catalog() {
    let server = server();
    let reply = roundtrip(
        &server,
        json!({"jsonrpc": "2.0", "id": "a", "method": "tools/list"}),
    )
    .await;
    let tools = reply["result"]["tools"].as_array().expect("tools");
    assert_eq!(tools.len(), 44);
    assert_eq!(tools[0]["name"], "get_matters");
    assert_eq!(tools[0]["inputSchema"]["type"], "object");
}

#[tokio::test]
async fn unknown_tool_is_content_not_a_protocol_error() {
    let server = server();
    let reply = roundtrip(
        &server,
        json!({
            "jsonrpc": "2.0",
            "id": 2,
            "method": "tools/call",
            "params": {"name": "y", "arguments": {}}
        }),
    )
    .await;
    assert!(reply.get("error").is_none());
    assert_eq!(
        reply["result"],
        json!({"content": [{"type": "text", "text": "Error: Unknown tool: y"}]})
    );
}

#[tokio::test]
async fn protocol_faults_use_json_rpc_codes() {
    let server = server();

    let parse: Value =
        serde_json::from_str(&server.handle_line("{not json").await.expect("reply"))
            .expect("json");
    assert_eq!(parse["error"]["code"], -32700);
    assert_eq!(parse["id"], Value::Null);

    let unknown = roundtrip(
        &server,
        json!({"jsonrpc": "2.0", "id": 3, "method": "resources/list"}),
    )
    .await;
    assert_eq!(unknown["error"]["code"], -32601);

    let invalid = roundtrip(&server, json!({"jsonrpc": "2.0", "id": 4})).await;
    assert_eq!(invalid["error"]["code"], -32600);
    assert_eq!(invalid["id"], 4);
}

#[tokio::test]
async fn notifications_and_blank_lines_get_no_reply() {
    let server = server();
    assert!(server
        .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
        .await
        .is_none());
    assert!(server.handle_line("   ").await.is_none());
}

#[tokio::test]
async fn serve_answers_each_line_in_order() {
    let server = server();
    let input = concat!(
        r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
        "\n",
        r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        "\n",
        r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"get_matters"}}"#,
        "\n"
    );
    let mut output = Vec::new();
    server
        .serve(BufReader::new(input.as_bytes()), &mut output)
        .await
        .expect("serve");

    let lines: Vec<Value> = String::from_utf8(output)
        .expect("utf8")
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["id"], 1);
    assert_eq!(lines[1]["id"], 2);
    assert_eq!(lines[1]["result"]["content"][0]["text"], "{\n  \"data\": []\n}");
}
