use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    InvalidParams,
    AuthPrecondition,
    Backend,
    Parse,
    TokenExchange,
    TokenRefresh,
    ToolNotFound,
    Network,
    Internal,
}

/// Structured failure of a tool invocation.
///
/// `detail` holds the raw diagnostic (backend error field, parser message,
/// ...). The outward text is produced by `Display`, which prefixes it
/// according to `kind` and `status_code`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolError {
    pub kind: ToolErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ToolError {
    pub fn new(kind: ToolErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            status_code: None,
            detail: detail.into(),
            step: None,
            hint: None,
            details: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Attributes the failure to a named step of a composite tool. The
    /// innermost step wins when steps are nested.
    pub fn in_step(mut self, step: impl Into<String>) -> Self {
        if self.step.is_none() {
            self.step = Some(step.into());
        }
        self
    }

    pub fn invalid_params(detail: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::InvalidParams, detail)
    }

    pub fn missing_token() -> Self {
        Self::new(
            ToolErrorKind::AuthPrecondition,
            "No access token provided. Use get_auth_url and exchange_code to obtain one.",
        )
    }

    pub fn backend(status: u16, detail: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Backend, detail).with_status(status)
    }

    pub fn parse(detail: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Parse, detail)
    }

    pub fn token_exchange(status: u16, detail: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::TokenExchange, detail).with_status(status)
    }

    pub fn token_refresh(status: u16, detail: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::TokenRefresh, detail).with_status(status)
    }

    pub fn tool_not_found(name: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::ToolNotFound, name)
    }

    pub fn network(detail: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Network, detail)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Internal, detail)
    }

    fn status_text(&self) -> String {
        self.status_code
            .map(|code| code.to_string())
            .unwrap_or_else(|| "?".to_string())
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ToolErrorKind::Backend => {
                write!(f, "API Error: {} - {}", self.status_text(), self.detail)?
            }
            ToolErrorKind::TokenExchange => {
                write!(f, "Token Error: {} - {}", self.status_text(), self.detail)?
            }
            ToolErrorKind::TokenRefresh => {
                write!(f, "Refresh Error: {} - {}", self.status_text(), self.detail)?
            }
            ToolErrorKind::Parse => write!(f, "Parse Error: {}", self.detail)?,
            ToolErrorKind::ToolNotFound => write!(f, "Unknown tool: {}", self.detail)?,
            _ => write!(f, "{}", self.detail)?,
        }
        if let Some(step) = &self.step {
            write!(f, " (step: {})", step)?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\nHint: {}", hint)?;
        }
        Ok(())
    }
}

impl Error for ToolError {}

impl From<std::io::Error> for ToolError {
    fn from(err: std::io::Error) -> Self {
        ToolError::internal(err.to_string())
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        ToolError::parse(err.to_string())
    }
}
