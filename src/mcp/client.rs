//! MCP client.
//!
//! Typed calls over a [`ProtocolEngine`]. Every call sends one request and
//! waits for its response before returning; a JSON-RPC error response is
//! surfaced as [`Error::Rpc`].

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::mcp::engine::ProtocolEngine;
use crate::mcp::prompts::{GetPromptResult, ListPromptsResult, Prompt};
use crate::mcp::protocol::{Implementation, InitializeResult, ListToolsResult, Tool, MCP_VERSION};
use crate::mcp::resources::{ListResourcesResult, ReadResourceResult, Resource};
use crate::mcp::transport::Transport;

/// MCP client bound to one connection.
pub struct McpClient<T: Transport> {
    engine: ProtocolEngine<T>,
    server_info: Option<InitializeResult>,
}

impl<T: Transport> McpClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            engine: ProtocolEngine::new(transport),
            server_info: None,
        }
    }

    /// Result of the last successful `initialize`.
    pub fn server_info(&self) -> Option<&InitializeResult> {
        self.server_info.as_ref()
    }

    pub fn engine(&self) -> &ProtocolEngine<T> {
        &self.engine
    }

    /// Send a request and wait for its result.
    pub async fn request(&mut self, method: &str, params: Option<Value>) -> Result<Value> {
        let id = self.engine.send_request(method, params).await?;
        let response = self.engine.await_response(&id).await?;
        response.into_result().map_err(|e| {
            debug!("{} returned error {}: {}", method, e.code, e.message);
            Error::Rpc(e)
        })
    }

    async fn request_as<R: DeserializeOwned>(
        &mut self,
        method: &str,
        params: Option<Value>,
    ) -> Result<R> {
        let value = self.request(method, params).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Send a notification.
    pub async fn notify(&mut self, method: &str, params: Option<Value>) -> Result<()> {
        self.engine.send_notification(method, params).await
    }

    /// Perform the initialize handshake, then announce `notifications/initialized`.
    pub async fn initialize(&mut self, client: Implementation) -> Result<InitializeResult> {
        let params = json!({
            "protocolVersion": MCP_VERSION,
            "capabilities": {},
            "clientInfo": client,
        });
        let result: InitializeResult = self.request_as("initialize", Some(params)).await?;
        info!(
            "Connected to {} v{} (protocol {})",
            result.server_info.name, result.server_info.version, result.protocol_version
        );

        self.notify("notifications/initialized", None).await?;
        self.server_info = Some(result.clone());
        Ok(result)
    }

    pub async fn ping(&mut self) -> Result<()> {
        self.request("ping", None).await.map(|_| ())
    }

    pub async fn list_resources(&mut self) -> Result<Vec<Resource>> {
        let result: ListResourcesResult = self.request_as("resources/list", None).await?;
        Ok(result.resources)
    }

    pub async fn read_resource(&mut self, uri: &str) -> Result<ReadResourceResult> {
        self.request_as("resources/read", Some(json!({ "uri": uri })))
            .await
    }

    pub async fn list_tools(&mut self) -> Result<Vec<Tool>> {
        let result: ListToolsResult = self.request_as("tools/list", None).await?;
        Ok(result.tools)
    }

    /// Call a tool. The handler's result is returned untouched.
    pub async fn call_tool(&mut self, name: &str, arguments: Value) -> Result<Value> {
        self.request(
            "tools/call",
            Some(json!({ "name": name, "arguments": arguments })),
        )
        .await
    }

    pub async fn list_prompts(&mut self) -> Result<Vec<Prompt>> {
        let result: ListPromptsResult = self.request_as("prompts/list", None).await?;
        Ok(result.prompts)
    }

    pub async fn get_prompt(
        &mut self,
        name: &str,
        arguments: HashMap<String, String>,
    ) -> Result<GetPromptResult> {
        self.request_as(
            "prompts/get",
            Some(json!({ "name": name, "arguments": arguments })),
        )
        .await
    }

    /// Close the connection.
    pub async fn close(&mut self) -> Result<()> {
        self.engine.close().await
    }
}
