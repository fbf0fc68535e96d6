use std::sync::Arc;

use crate::errors::ToolError;
use crate::mcp::server::McpServer;
use crate::services::config::{ConfigLayer, ConfigResolver, EffectiveConfig};
use crate::services::credentials::CredentialStore;
use crate::services::dispatcher::Dispatcher;
use crate::services::logger::Logger;
use crate::services::platform::Platform;
use crate::services::registry::ToolRegistry;
use crate::services::token::TokenManager;
use crate::services::transport::{build_client, HttpTransport, Transport};
use crate::tools::builtin_catalogs;

/// Process-wide wiring: resolved configuration, the session credential and
/// the dispatcher that owns the tool registry.
pub struct App {
    pub logger: Logger,
    pub config: Arc<EffectiveConfig>,
    pub credentials: CredentialStore,
    pub tokens: Arc<TokenManager>,
    pub dispatcher: Dispatcher,
}

impl App {
    /// Resolves configuration from the environment, config files and
    /// `flags`, then wires the live HTTP stack.
    pub fn initialize(flags: ConfigLayer) -> Result<Self, ToolError> {
        let logger = Logger::new("clio");
        let platform = Platform::detect();
        logger.debug(
            "Detected platform",
            Some(&serde_json::json!({"platform": platform.name()})),
        );
        let config = ConfigResolver::from_process(logger.clone(), flags, platform).resolve();

        let client = build_client()?;
        let transport: Arc<dyn Transport> =
            Arc::new(HttpTransport::with_client(client.clone(), logger.clone()));
        let tokens = Arc::new(TokenManager::new(client, logger.clone()));
        Self::assemble(config, transport, tokens, logger)
    }

    /// Wiring with caller-supplied collaborators; the registry is still the
    /// built-in catalog.
    pub fn assemble(
        config: EffectiveConfig,
        transport: Arc<dyn Transport>,
        tokens: Arc<TokenManager>,
        logger: Logger,
    ) -> Result<Self, ToolError> {
        let registry = Arc::new(ToolRegistry::register(builtin_catalogs())?);
        let credentials = CredentialStore::seeded(
            config.access_token.as_deref(),
            config.refresh_token.as_deref(),
        );
        let config = Arc::new(config);
        let dispatcher = Dispatcher::new(
            registry,
            config.clone(),
            credentials.clone(),
            transport,
            tokens.clone(),
            logger.clone(),
        );
        logger.info(
            "Server configured",
            Some(&serde_json::json!({
                "region": config.region.as_str(),
                "api_base": config.api_base,
                "client_id_configured": config.client_id.is_some(),
                "token_configured": credentials.access_token().is_some(),
            })),
        );
        Ok(Self {
            logger,
            config,
            credentials,
            tokens,
            dispatcher,
        })
    }

    pub fn server(&self) -> McpServer {
        McpServer::new(self.dispatcher.clone(), self.logger.clone())
    }
}
