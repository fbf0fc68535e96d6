use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;

use crate::errors::ToolError;
use crate::services::logger::Logger;
use crate::services::request::ApiRequest;

/// Executes an `ApiRequest` against a resolved base URL.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, base: &str, request: &ApiRequest, token: &str)
        -> Result<Value, ToolError>;
}

pub struct HttpTransport {
    client: Client,
    logger: Logger,
}

impl HttpTransport {
    pub fn new(logger: Logger) -> Result<Self, ToolError> {
        Ok(Self::with_client(build_client()?, logger))
    }

    pub fn with_client(client: Client, logger: Logger) -> Self {
        Self {
            client,
            logger: logger.child("http"),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(
        &self,
        base: &str,
        request: &ApiRequest,
        token: &str,
    ) -> Result<Value, ToolError> {
        let url = request.url(base);
        self.logger.debug(
            "Backend request",
            Some(&serde_json::json!({"method": request.method.as_str(), "url": url})),
        );

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", token));
        if let Some(body) = &request.body {
            builder = builder.body(serde_json::to_vec(body)?);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(map_reqwest_error)?;
        classify_response(status, &text, ToolError::backend)
    }
}

/// Shared by the backend transport and the token endpoint client.
pub fn build_client() -> Result<Client, ToolError> {
    Client::builder()
        .user_agent(concat!("clio-mcp/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|err| ToolError::internal(format!("Failed to build HTTP client: {}", err)))
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ToolError {
    ToolError::network(err.to_string())
}

/// Three-way outcome of a backend reply. A body that is not JSON is a parse
/// error whatever the status; otherwise non-2xx goes through `on_failure`
/// with the body's `error` field, or the raw body when that is missing.
pub(crate) fn classify_response(
    status: u16,
    body: &str,
    on_failure: impl FnOnce(u16, String) -> ToolError,
) -> Result<Value, ToolError> {
    let parsed: Value =
        serde_json::from_str(body).map_err(|err| ToolError::parse(err.to_string()))?;
    if (200..300).contains(&status) {
        return Ok(parsed);
    }
    let detail = match parsed.get("error") {
        Some(Value::String(text)) if !text.is_empty() => text.clone(),
        Some(Value::Null) | Some(Value::Bool(false)) | None => body.to_string(),
        Some(Value::String(_)) => body.to_string(),
        Some(other) => other.to_string(),
    };
    Err(on_failure(status, detail))
}
