#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Barrier;

use clio_mcp::errors::ToolError;
use clio_mcp::services::config::EffectiveConfig;
use clio_mcp::services::credentials::CredentialStore;
use clio_mcp::services::dispatcher::{Dispatcher, ToolResult};
use clio_mcp::services::logger::{LogLevel, Logger};
use clio_mcp::services::region::Region;
use clio_mcp::services::registry::ToolRegistry;
use clio_mcp::services::request::ApiRequest;
use clio_mcp::services::token::TokenManager;
use clio_mcp::services::transport::Transport;
use clio_mcp::tools::builtin_catalogs;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub base: String,
    pub request: ApiRequest,
    pub token: String,
}

impl RecordedCall {
    pub fn key(&self) -> String {
        call_key(self.request.method.as_str(), &self.request.path)
    }
}

fn call_key(method: &str, path: &str) -> String {
    format!("{} {}", method, path)
}

/// In-memory backend. Replies are scripted per `"METHOD /path"` and consumed
/// in order; unscripted calls answer `{"data": []}`.
#[derive(Default)]
pub struct RecordingTransport {
    calls: Mutex<Vec<RecordedCall>>,
    replies: Mutex<HashMap<String, VecDeque<Result<Value, ToolError>>>>,
    rendezvous: Option<(Vec<String>, Arc<Barrier>)>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, method: &str, path: &str, result: Result<Value, ToolError>) -> Self {
        self.replies
            .lock()
            .expect("replies lock")
            .entry(call_key(method, path))
            .or_default()
            .push_back(result);
        self
    }

    /// The listed calls block until all of them are in flight at once.
    pub fn rendezvous(mut self, keys: &[&str]) -> Self {
        let keys: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        let barrier = Arc::new(Barrier::new(keys.len()));
        self.rendezvous = Some((keys, barrier));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn keys(&self) -> Vec<String> {
        self.calls().iter().map(RecordedCall::key).collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn execute(
        &self,
        base: &str,
        request: &ApiRequest,
        token: &str,
    ) -> Result<Value, ToolError> {
        let key = call_key(request.method.as_str(), &request.path);
        self.calls.lock().expect("calls lock").push(RecordedCall {
            base: base.to_string(),
            request: request.clone(),
            token: token.to_string(),
        });
        if let Some((keys, barrier)) = &self.rendezvous {
            if keys.contains(&key) {
                barrier.wait().await;
            }
        }
        let scripted = self
            .replies
            .lock()
            .expect("replies lock")
            .get_mut(&key)
            .and_then(VecDeque::pop_front);
        scripted.unwrap_or_else(|| Ok(json!({"data": []})))
    }
}

pub fn quiet_logger() -> Logger {
    Logger::new("test").with_level(LogLevel::Error)
}

pub fn test_config() -> EffectiveConfig {
    let mut config = EffectiveConfig::for_region(Region::Us);
    config.client_id = Some("client-id".to_string());
    config.client_secret = Some("client-secret".to_string());
    config
}

pub fn dispatcher_for(
    registry: ToolRegistry,
    transport: Arc<RecordingTransport>,
    token: Option<&str>,
) -> Dispatcher {
    let logger = quiet_logger();
    Dispatcher::new(
        Arc::new(registry),
        Arc::new(test_config()),
        CredentialStore::seeded(token, None),
        transport,
        Arc::new(TokenManager::new(reqwest::Client::new(), logger.clone())),
        logger,
    )
}

pub fn dispatcher(transport: Arc<RecordingTransport>, token: Option<&str>) -> Dispatcher {
    let registry = ToolRegistry::register(builtin_catalogs()).expect("builtin catalog");
    dispatcher_for(registry, transport, token)
}

/// Parses a successful result's text back into JSON.
pub fn json_of(result: &ToolResult) -> Value {
    assert!(!result.is_error(), "unexpected error: {}", result.text());
    serde_json::from_str(&result.text()).expect("result text is JSON")
}
