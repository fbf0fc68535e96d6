use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};

use crate::errors::{McpError, ToolError};
use crate::mcp::protocol::{JsonRpcRequest, JsonRpcResponse};
use crate::services::dispatcher::Dispatcher;
use crate::services::logger::Logger;

pub const PROTOCOL_VERSION: &str = "2025-06-18";
pub const SERVER_NAME: &str = "clio-mcp-server";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

pub struct McpServer {
    dispatcher: Dispatcher,
    logger: Logger,
}

impl McpServer {
    pub fn new(dispatcher: Dispatcher, logger: Logger) -> Self {
        Self {
            dispatcher,
            logger: logger.child("mcp"),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    fn handle_initialize(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": { "name": SERVER_NAME, "version": SERVER_VERSION },
        })
    }

    fn handle_tools_list(&self) -> Value {
        json!({ "tools": self.dispatcher.registry().list() })
    }

    /// Tool failures come back as ordinary content; only the envelope
    /// itself can produce a JSON-RPC error.
    async fn handle_tools_call(&self, params: &Value) -> Value {
        let name = params.get("name").and_then(|v| v.as_str()).unwrap_or("");
        let args = params.get("arguments").cloned().unwrap_or(Value::Null);
        self.dispatcher.dispatch(name, args).await.to_protocol()
    }

    /// Handles one protocol line. `None` means nothing is written back.
    pub async fn handle_line(&self, line: &str) -> Option<String> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }

        let parsed: Value = match serde_json::from_str(trimmed) {
            Ok(value) => value,
            Err(err) => {
                self.logger
                    .warn("Unparsable request line", Some(&json!({"error": err.to_string()})));
                return Some(JsonRpcResponse::failure(Value::Null, McpError::parse_error()).to_line());
            }
        };
        let fallback_id = parsed.get("id").cloned().unwrap_or(Value::Null);
        let request: JsonRpcRequest = match serde_json::from_value(parsed) {
            Ok(request) => request,
            Err(_) => {
                return Some(
                    JsonRpcResponse::failure(fallback_id, McpError::invalid_request()).to_line(),
                )
            }
        };

        self.handle_request(request)
            .await
            .map(|response| response.to_line())
    }

    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            self.logger
                .debug("Notification", Some(&json!({"method": request.method})));
            return None;
        }
        let id = request.id.clone().unwrap_or(Value::Null);

        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(id, self.handle_initialize()),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, self.handle_tools_list()),
            "tools/call" => {
                JsonRpcResponse::success(id, self.handle_tools_call(&request.params).await)
            }
            other => JsonRpcResponse::failure(id, McpError::method_not_found(other)),
        };
        Some(response)
    }

    /// Newline-delimited JSON-RPC until the reader hits EOF. One request is
    /// in flight at a time.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<(), ToolError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        let mut writer = BufWriter::new(writer);

        while let Some(line) = lines.next_line().await? {
            if let Some(payload) = self.handle_line(&line).await {
                writer.write_all(payload.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }
        Ok(())
    }

    pub async fn run_stdio(&self) -> Result<(), ToolError> {
        self.logger.info(
            "Clio MCP server running on stdio",
            Some(&json!({"tools": self.dispatcher.registry().len()})),
        );
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }
}
