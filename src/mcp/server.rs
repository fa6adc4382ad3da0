//! MCP server implementation.
//!
//! The server reads one frame at a time from its [`ProtocolEngine`], resolves
//! requests against the tool, resource and prompt registries, and writes the
//! reply before reading the next frame.

use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::mcp::codec::Message;
use crate::mcp::engine::ProtocolEngine;
use crate::mcp::handler::ToolRegistry;
use crate::mcp::prompts::{ListPromptsResult, PromptRegistry};
use crate::mcp::protocol::*;
use crate::mcp::resources::{ListResourcesResult, ResourceRegistry};
use crate::mcp::transport::Transport;
use crate::metrics::{Metrics, MetricsSnapshot, Timer};
use crate::VERSION;

/// MCP server.
pub struct McpServer {
    tools: Arc<ToolRegistry>,
    resources: Arc<ResourceRegistry>,
    prompts: Arc<PromptRegistry>,
    info: Implementation,
    metrics: Metrics,
}

impl McpServer {
    /// Create a server with empty registries.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            tools: Arc::new(ToolRegistry::new()),
            resources: Arc::new(ResourceRegistry::new()),
            prompts: Arc::new(PromptRegistry::new()),
            info: Implementation::new(name, VERSION),
            metrics: Metrics::new(),
        }
    }

    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = Arc::new(tools);
        self
    }

    pub fn with_resources(mut self, resources: ResourceRegistry) -> Self {
        self.resources = Arc::new(resources);
        self
    }

    pub fn with_prompts(mut self, prompts: PromptRegistry) -> Self {
        self.prompts = Arc::new(prompts);
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.info.version = version.into();
        self
    }

    pub fn info(&self) -> &Implementation {
        &self.info
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Run the server until the transport reaches end of stream.
    ///
    /// Returns `Ok(())` on a clean EOF and the transport error otherwise.
    pub async fn run<T: Transport>(&self, transport: T) -> Result<()> {
        info!("Starting MCP server: {} v{}", self.info.name, self.info.version);

        let mut engine = ProtocolEngine::new(transport);
        let outcome = self.serve(&mut engine).await;

        if let Err(e) = engine.close().await {
            debug!("Error closing transport: {}", e);
        }

        let stats = self.metrics.snapshot();
        info!(
            requests = stats.requests_total,
            failed = stats.requests_failed,
            notifications = stats.notifications_total,
            skipped_frames = engine.skipped_frames(),
            "MCP server stopped"
        );

        match outcome {
            Err(Error::Eof) => Ok(()),
            Err(e) => {
                error!("Transport failed: {}", e);
                Err(e)
            }
            Ok(()) => Ok(()),
        }
    }

    async fn serve<T: Transport>(&self, engine: &mut ProtocolEngine<T>) -> Result<()> {
        loop {
            match engine.receive().await? {
                Message::Request(req) => {
                    let response = self.handle_request(req).await;
                    engine.reply(response).await?;
                }
                Message::Notification(notif) => {
                    self.handle_notification(notif);
                }
                Message::Response(res) => {
                    warn!("Received unexpected response (id: {})", res.id);
                }
            }
        }
    }

    /// Handle a JSON-RPC request.
    pub async fn handle_request(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        debug!("Handling request: {} (id: {})", req.method, req.id);
        let timer = Timer::start();
        self.metrics.inc_requests();

        let result = match req.method.as_str() {
            // Core
            "initialize" => self.handle_initialize(req.params),
            "ping" => Ok(json!({})),
            // Tools
            "tools/list" => self.handle_list_tools().await,
            "tools/call" => self.handle_call_tool(req.params).await,
            // Prompts
            "prompts/list" => self.handle_list_prompts().await,
            "prompts/get" => self.handle_get_prompt(req.params).await,
            // Resources
            "resources/list" => self.handle_list_resources().await,
            "resources/read" => self.handle_read_resource(req.params).await,
            // Unknown
            _ => Err(Error::MethodNotFound(req.method.clone())),
        };

        match result {
            Ok(value) => {
                debug!("{} completed in {}ms", req.method, timer.elapsed_ms());
                JsonRpcResponse::success(req.id, value)
            }
            Err(e) => {
                self.metrics.inc_failed();
                debug!("{} failed in {}ms: {}", req.method, timer.elapsed_ms(), e);
                JsonRpcResponse::failure(req.id, e.to_rpc_error())
            }
        }
    }

    /// Handle a notification. Notifications never get a reply.
    fn handle_notification(&self, notif: JsonRpcNotification) {
        self.metrics.inc_notifications();

        match notif.method.as_str() {
            "notifications/initialized" => {
                info!("Client initialized");
            }
            "notifications/cancelled" => {
                // Requests are handled one at a time, so there is never one in flight to cancel.
                debug!("Ignoring cancellation: {:?}", notif.params);
            }
            _ => {
                debug!("Unknown notification: {}", notif.method);
            }
        }
    }

    /// Handle initialize request.
    fn handle_initialize(&self, params: Option<Value>) -> Result<Value> {
        if let Some(params) = params {
            match serde_json::from_value::<InitializeParams>(params) {
                Ok(init) => {
                    if let Some(client) = init.client_info {
                        info!(
                            "Client: {} v{} (protocol {})",
                            client.name, client.version, init.protocol_version
                        );
                    }
                }
                Err(e) => debug!("Unrecognized initialize params: {}", e),
            }
        }

        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: self.capabilities(),
            server_info: self.info.clone(),
        };

        Ok(serde_json::to_value(result)?)
    }

    /// Capabilities advertised for the registries that have entries.
    fn capabilities(&self) -> ServerCapabilities {
        ServerCapabilities {
            tools: (!self.tools.is_empty()).then(ToolsCapability::default),
            resources: (!self.resources.is_empty()).then(ResourcesCapability::default),
            prompts: (!self.prompts.is_empty()).then(PromptsCapability::default),
        }
    }

    /// Handle list tools request.
    async fn handle_list_tools(&self) -> Result<Value> {
        let tools = self
            .isolate("Tool listing".to_string(), async { Ok(self.tools.list()) })
            .await?;
        Ok(serde_json::to_value(ListToolsResult { tools })?)
    }

    /// Handle call tool request.
    async fn handle_call_tool(&self, params: Option<Value>) -> Result<Value> {
        let params: CallToolParams = parse_params(params)?;

        let handler = self
            .tools
            .get(&params.name)
            .ok_or_else(|| Error::ToolNotFound(params.name.clone()))?;

        self.metrics.inc_tool_calls();
        let arguments = params.arguments.unwrap_or_default();
        self.isolate(
            format!("Tool '{}'", params.name),
            handler.execute(arguments),
        )
        .await
    }

    /// Handle list prompts request.
    async fn handle_list_prompts(&self) -> Result<Value> {
        let prompts = self
            .isolate("Prompt listing".to_string(), async { Ok(self.prompts.list()) })
            .await?;
        Ok(serde_json::to_value(ListPromptsResult { prompts })?)
    }

    /// Handle get prompt request.
    async fn handle_get_prompt(&self, params: Option<Value>) -> Result<Value> {
        #[derive(serde::Deserialize)]
        struct GetPromptParams {
            name: String,
            #[serde(default)]
            arguments: Option<HashMap<String, String>>,
        }

        let params: GetPromptParams = parse_params(params)?;
        let arguments = params.arguments.unwrap_or_default();

        let result = self
            .isolate(
                format!("Prompt '{}'", params.name),
                self.prompts.get(&params.name, &arguments),
            )
            .await?;
        Ok(serde_json::to_value(result)?)
    }

    /// Handle list resources request.
    async fn handle_list_resources(&self) -> Result<Value> {
        let resources = self
            .isolate("Resource listing".to_string(), async { Ok(self.resources.list()) })
            .await?;
        Ok(serde_json::to_value(ListResourcesResult { resources })?)
    }

    /// Handle read resource request.
    async fn handle_read_resource(&self, params: Option<Value>) -> Result<Value> {
        #[derive(serde::Deserialize)]
        struct ReadParams {
            uri: String,
        }

        let params: ReadParams = parse_params(params)?;

        let result = self
            .isolate(
                format!("Resource '{}'", params.uri),
                self.resources.read(&params.uri),
            )
            .await?;
        Ok(serde_json::to_value(result)?)
    }

    /// Run a handler so that neither its errors nor its panics escape the loop.
    ///
    /// Lookup and parameter errors keep their own code; everything else is
    /// reported as an internal error.
    async fn isolate<V, F>(&self, what: String, fut: F) -> Result<V>
    where
        F: Future<Output = Result<V>>,
    {
        match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) if e.rpc_code() == error_codes::INVALID_PARAMS => Err(e),
            Ok(Err(e)) => {
                self.metrics.inc_handler_failures();
                warn!("{} failed: {}", what, e);
                Err(Error::Internal(format!("{} failed: {}", what, e)))
            }
            Err(panic) => {
                self.metrics.inc_handler_failures();
                let reason = panic_message(panic.as_ref());
                warn!("{} panicked: {}", what, reason);
                Err(Error::Internal(format!("{} panicked: {}", what, reason)))
            }
        }
    }
}

/// Deserialize request params, reporting shape errors as invalid params.
fn parse_params<P: DeserializeOwned>(params: Option<Value>) -> Result<P> {
    let value = params.ok_or_else(|| Error::InvalidParams("Missing params".to_string()))?;
    serde_json::from_value(value).map_err(|e| Error::InvalidParams(e.to_string()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
