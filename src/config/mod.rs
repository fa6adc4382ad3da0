//! Configuration management for the MCP engine.

use clap::Parser;
use serde::{Deserialize, Serialize};

/// Command-line arguments for the MCP engine server.
#[derive(Parser, Debug, Clone)]
#[command(name = "mcp-engine")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Model Context Protocol server speaking JSON-RPC 2.0 over stdio")]
pub struct Args {
    /// Server name reported in serverInfo
    #[arg(long, default_value = "mcp-engine", env = "MCP_ENGINE_NAME")]
    pub name: String,

    /// Expose a file as a resource (path or file:// URI, repeatable)
    #[arg(long = "resource", value_name = "PATH", env = "MCP_ENGINE_RESOURCES", value_delimiter = ',')]
    pub resources: Vec<String>,

    /// Do not register the built-in tools and prompts
    #[arg(long)]
    pub no_builtins: bool,

    /// Enable debug logging
    #[arg(short, long, env = "MCP_ENGINE_DEBUG")]
    pub debug: bool,

    /// Log output format
    #[arg(long, default_value = "text", env = "MCP_ENGINE_LOG_FORMAT")]
    pub log_format: LogFormat,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server name
    pub name: String,
    /// Files exposed as resources
    pub resources: Vec<String>,
    /// Built-in tools and prompts enabled
    pub builtins: bool,
    /// Debug mode
    pub debug: bool,
    /// Log format
    pub log_format: LogFormat,
}

impl Config {
    /// Default `tracing` filter directive when `RUST_LOG` is unset.
    pub fn default_log_directive(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            name: args.name,
            resources: args
                .resources
                .into_iter()
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .collect(),
            builtins: !args.no_builtins,
            debug: args.debug,
            log_format: args.log_format,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: "mcp-engine".to_string(),
            resources: Vec::new(),
            builtins: true,
            debug: false,
            log_format: LogFormat::Text,
        }
    }
}
