use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use crate::errors::ToolError;
use crate::services::config::EffectiveConfig;
use crate::services::credentials::CredentialStore;
use crate::services::logger::Logger;
use crate::services::registry::ToolRegistry;
use crate::services::request::{ApiRequest, ApiTarget};
use crate::services::token::TokenManager;
use crate::services::transport::Transport;

/// Everything a handler may touch during one invocation.
pub struct ToolContext {
    pub config: Arc<EffectiveConfig>,
    pub credentials: CredentialStore,
    pub access_token: Option<String>,
    pub transport: Arc<dyn Transport>,
    pub tokens: Arc<TokenManager>,
    pub logger: Logger,
}

impl ToolContext {
    pub fn base_url(&self, target: ApiTarget) -> &str {
        match target {
            ApiTarget::Primary => &self.config.api_base,
            ApiTarget::Grow => &self.config.grow_base,
        }
    }

    /// Fails with the missing-token error before any I/O when no token
    /// resolved for this call.
    pub async fn call(&self, request: ApiRequest) -> Result<Value, ToolError> {
        let token = self
            .access_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or_else(ToolError::missing_token)?;
        let base = self.base_url(request.target);
        self.transport.execute(base, &request, token).await
    }
}

#[derive(Debug, Clone)]
pub enum ToolResult {
    Content(String),
    Error(ToolError),
}

impl ToolResult {
    pub fn is_error(&self) -> bool {
        matches!(self, ToolResult::Error(_))
    }

    pub fn text(&self) -> String {
        match self {
            ToolResult::Content(text) => text.clone(),
            ToolResult::Error(err) => format!("Error: {}", err),
        }
    }

    pub fn to_protocol(&self) -> Value {
        serde_json::json!({
            "content": [ { "type": "text", "text": self.text() } ]
        })
    }
}

/// Strings pass through untouched; anything else is pretty JSON.
pub fn render_output(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => serde_json::to_string_pretty(&other).unwrap_or_else(|_| other.to_string()),
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    config: Arc<EffectiveConfig>,
    credentials: CredentialStore,
    transport: Arc<dyn Transport>,
    tokens: Arc<TokenManager>,
    logger: Logger,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<ToolRegistry>,
        config: Arc<EffectiveConfig>,
        credentials: CredentialStore,
        transport: Arc<dyn Transport>,
        tokens: Arc<TokenManager>,
        logger: Logger,
    ) -> Self {
        Self {
            registry,
            config,
            credentials,
            transport,
            tokens,
            logger: logger.child("dispatch"),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub async fn dispatch(&self, name: &str, args: Value) -> ToolResult {
        let call_id = uuid::Uuid::new_v4().to_string();
        let started = Instant::now();
        self.logger.debug(
            "Tool call",
            Some(&serde_json::json!({"tool": name, "call_id": call_id, "arguments": &args})),
        );

        match self.run(name, args).await {
            Ok(value) => {
                self.logger.info(
                    "Tool call completed",
                    Some(&serde_json::json!({
                        "tool": name,
                        "call_id": call_id,
                        "duration_ms": started.elapsed().as_millis() as u64,
                    })),
                );
                ToolResult::Content(render_output(value))
            }
            Err(err) => {
                self.logger.warn(
                    "Tool call failed",
                    Some(&serde_json::json!({
                        "tool": name,
                        "call_id": call_id,
                        "duration_ms": started.elapsed().as_millis() as u64,
                        "error": &err,
                    })),
                );
                ToolResult::Error(err)
            }
        }
    }

    async fn run(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        let tool = self
            .registry
            .get(name)
            .ok_or_else(|| self.registry.unknown_tool(name))?;
        let args = match args {
            Value::Null => Value::Object(Default::default()),
            Value::Object(_) => args,
            _ => return Err(ToolError::invalid_params("arguments must be an object")),
        };
        tool.validate(&args)?;

        let ctx = ToolContext {
            config: self.config.clone(),
            credentials: self.credentials.clone(),
            access_token: self.resolve_token(&args),
            transport: self.transport.clone(),
            tokens: self.tokens.clone(),
            logger: self.logger.child(name),
        };
        let handler = tool.definition.handler.clone();
        AssertUnwindSafe(handler.handle(&ctx, args))
            .catch_unwind()
            .await
            .map_err(|panic| {
                ToolError::internal(format!(
                    "Tool {} panicked: {}",
                    name,
                    panic_message(panic.as_ref())
                ))
            })?
    }

    /// Per-call override first, then whatever the store holds right now.
    fn resolve_token(&self, args: &Value) -> Option<String> {
        args.get("access_token")
            .and_then(|v| v.as_str())
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .or_else(|| self.credentials.access_token())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        return text.to_string();
    }
    if let Some(text) = payload.downcast_ref::<String>() {
        return text.clone();
    }
    "unknown panic".to_string()
}
