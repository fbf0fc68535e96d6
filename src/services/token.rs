use reqwest::header::ACCEPT;
use reqwest::Client;
use serde_json::Value;

use crate::errors::ToolError;
use crate::services::config::EffectiveConfig;
use crate::services::credentials::Credential;
use crate::services::logger::Logger;
use crate::services::transport::{classify_response, map_reqwest_error};

pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:3000/oauth/callback";

/// Successful grant: the credential plus the token endpoint's full reply.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub credential: Credential,
    pub response: Value,
}

#[derive(Clone, Copy)]
enum GrantKind {
    AuthorizationCode,
    RefreshToken,
}

impl GrantKind {
    fn failure(self) -> fn(u16, String) -> ToolError {
        match self {
            GrantKind::AuthorizationCode => |status, detail| ToolError::token_exchange(status, detail),
            GrantKind::RefreshToken => |status, detail| ToolError::token_refresh(status, detail),
        }
    }
}

/// OAuth token endpoint client. Holds no credential state of its own.
pub struct TokenManager {
    client: Client,
    logger: Logger,
}

impl TokenManager {
    pub fn new(client: Client, logger: Logger) -> Self {
        Self {
            client,
            logger: logger.child("oauth"),
        }
    }

    pub fn authorize_url(config: &EffectiveConfig, redirect_uri: &str) -> Result<String, ToolError> {
        let client_id = require_client_id(config)?;
        let query = serde_urlencoded::to_string([
            ("response_type", "code"),
            ("client_id", client_id),
            ("redirect_uri", redirect_uri),
        ])
        .map_err(|err| ToolError::internal(err.to_string()))?;
        Ok(format!(
            "{}/oauth/authorize?{}",
            config.auth_base.trim_end_matches('/'),
            query
        ))
    }

    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        config: &EffectiveConfig,
    ) -> Result<TokenGrant, ToolError> {
        let client_id = require_client_id(config)?;
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", client_id),
            ("client_secret", config.client_secret.as_deref().unwrap_or("")),
            ("redirect_uri", redirect_uri),
        ];
        self.request_grant(&form, GrantKind::AuthorizationCode, config, None)
            .await
    }

    /// The previous refresh token is kept when the reply does not rotate it.
    pub async fn refresh(
        &self,
        refresh_token: &str,
        config: &EffectiveConfig,
    ) -> Result<TokenGrant, ToolError> {
        let client_id = require_client_id(config)?;
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", client_id),
            ("client_secret", config.client_secret.as_deref().unwrap_or("")),
        ];
        self.request_grant(&form, GrantKind::RefreshToken, config, Some(refresh_token))
            .await
    }

    async fn request_grant(
        &self,
        form: &[(&str, &str)],
        kind: GrantKind,
        config: &EffectiveConfig,
        previous_refresh: Option<&str>,
    ) -> Result<TokenGrant, ToolError> {
        let url = format!("{}/oauth/token", config.auth_base.trim_end_matches('/'));
        self.logger.info(
            "Requesting token grant",
            Some(&serde_json::json!({"url": url, "grant_type": form[0].1})),
        );
        let response = self
            .client
            .post(&url)
            .header(ACCEPT, "application/json")
            .form(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(map_reqwest_error)?;
        let body = classify_response(status, &text, kind.failure())?;

        let access_token = body
            .get("access_token")
            .and_then(|v| v.as_str())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ToolError::parse("token response has no access_token"))?;
        let refresh_token = body
            .get("refresh_token")
            .and_then(|v| v.as_str())
            .filter(|token| !token.is_empty())
            .or(previous_refresh)
            .map(str::to_string);

        Ok(TokenGrant {
            credential: Credential::new(access_token, refresh_token),
            response: body,
        })
    }
}

fn require_client_id(config: &EffectiveConfig) -> Result<&str, ToolError> {
    config.client_id.as_deref().ok_or_else(|| {
        ToolError::invalid_params("No Client ID configured")
            .with_hint("Set CLIO_CLIENT_ID or use --client-id")
    })
}
