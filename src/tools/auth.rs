use async_trait::async_trait;
use serde_json::{json, Value};

use crate::errors::ToolError;
use crate::services::dispatcher::{render_output, ToolContext};
use crate::services::registry::{ToolDefinition, ToolHandler};
use crate::services::token::{TokenGrant, TokenManager, DEFAULT_REDIRECT_URI};
use crate::services::validation::{ensure_string, optional_string, string_or};
use crate::tools::{define, object_schema};

/// OAuth bootstrap tools. Successful grants replace the session credential.
#[derive(Debug, Clone, Copy)]
pub enum AuthTool {
    GetAuthUrl,
    ExchangeCode,
    RefreshAccessToken,
}

pub fn catalog() -> Vec<ToolDefinition> {
    let redirect = json!({
        "type": "string",
        "description": "OAuth redirect URI (must match authorization)",
        "default": DEFAULT_REDIRECT_URI,
    });
    vec![
        define(
            "get_auth_url",
            "Get Clio OAuth authorization URL",
            object_schema(json!({"redirect_uri": redirect.clone()}), &[]),
            AuthTool::GetAuthUrl,
        ),
        define(
            "exchange_code",
            "Exchange authorization code for access token",
            object_schema(
                json!({
                    "code": {"type": "string", "description": "Authorization code from OAuth callback"},
                    "redirect_uri": redirect,
                }),
                &["code"],
            ),
            AuthTool::ExchangeCode,
        ),
        define(
            "refresh_access_token",
            "Refresh the access token using a refresh token",
            object_schema(
                json!({
                    "refresh_token": {
                        "type": "string",
                        "description": "Refresh token (defaults to the one held by this session)"
                    },
                }),
                &[],
            ),
            AuthTool::RefreshAccessToken,
        ),
    ]
}

fn grant_summary(headline: &str, grant: &TokenGrant) -> String {
    format!(
        "{}\n\nAccess Token: {}\n\nThe token is now active for this session.\n\nFull response:\n{}",
        headline,
        grant.credential.access_token,
        render_output(grant.response.clone())
    )
}

#[async_trait]
impl ToolHandler for AuthTool {
    async fn handle(&self, ctx: &ToolContext, args: Value) -> Result<Value, ToolError> {
        match self {
            AuthTool::GetAuthUrl => {
                let redirect_uri = string_or(&args, "redirect_uri", DEFAULT_REDIRECT_URI)?;
                let url = TokenManager::authorize_url(&ctx.config, &redirect_uri)?;
                Ok(Value::String(format!(
                    "To authorize this app with Clio:\n\n1. Visit this URL:\n{}\n\n\
                     2. Log in and authorize the app\n\
                     3. You'll be redirected to get an authorization code\n\
                     4. Use the exchange_code tool with that code",
                    url
                )))
            }
            AuthTool::ExchangeCode => {
                let code = ensure_string(&args, "code")?;
                let redirect_uri = string_or(&args, "redirect_uri", DEFAULT_REDIRECT_URI)?;
                let grant = ctx
                    .tokens
                    .exchange_code(&code, &redirect_uri, &ctx.config)
                    .await?;
                ctx.credentials.replace(grant.credential.clone());
                ctx.logger.info("Session credential replaced after code exchange", None);
                Ok(Value::String(grant_summary(
                    "Access token obtained successfully!",
                    &grant,
                )))
            }
            AuthTool::RefreshAccessToken => {
                let refresh_token = optional_string(&args, "refresh_token")?
                    .or_else(|| ctx.credentials.refresh_token())
                    .or_else(|| ctx.config.refresh_token.clone())
                    .ok_or_else(|| {
                        ToolError::invalid_params("No refresh token available")
                            .with_hint("Pass refresh_token or set CLIO_REFRESH_TOKEN")
                    })?;
                let grant = ctx.tokens.refresh(&refresh_token, &ctx.config).await?;
                ctx.credentials.replace(grant.credential.clone());
                ctx.logger.info("Session credential replaced after refresh", None);
                Ok(Value::String(grant_summary(
                    "Access token refreshed successfully!",
                    &grant,
                )))
            }
        }
    }
}
