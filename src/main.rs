//! MCP Engine - stdio server
//!
//! Speaks JSON-RPC 2.0 on stdin/stdout, one frame per line. Logs go to stderr.

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mcp_engine::config::{Args, Config, LogFormat};
use mcp_engine::mcp::handler::ToolRegistry;
use mcp_engine::mcp::prompts::PromptRegistry;
use mcp_engine::mcp::resources::{FileResource, ResourceRegistry};
use mcp_engine::mcp::server::McpServer;
use mcp_engine::mcp::transport::StdioTransport;
use mcp_engine::tools;
use mcp_engine::VERSION;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Build configuration from args
    let config: Config = args.into();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_log_directive()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let installed = match config.log_format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))?;

    info!("MCP Engine v{}", VERSION);

    let mut tool_registry = ToolRegistry::new();
    let prompt_registry = if config.builtins {
        tools::register_builtin_tools(&mut tool_registry);
        PromptRegistry::with_builtins()
    } else {
        PromptRegistry::new()
    };

    let mut resource_registry = ResourceRegistry::new();
    for arg in &config.resources {
        let resource = FileResource::from_arg(arg)
            .with_context(|| format!("Invalid --resource {}", arg))?;
        info!("Exposing resource {}", resource.uri());
        resource_registry.register(resource);
    }

    info!(
        "Registered {} tools, {} resources, {} prompts",
        tool_registry.len(),
        resource_registry.len(),
        prompt_registry.len()
    );

    let server = McpServer::new(config.name.clone())
        .with_tools(tool_registry)
        .with_resources(resource_registry)
        .with_prompts(prompt_registry);

    server
        .run(StdioTransport::stdio())
        .await
        .context("MCP server terminated")?;

    Ok(())
}
