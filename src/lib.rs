//! MCP Engine - Model Context Protocol over JSON-RPC 2.0
//!
//! A small, layered implementation of MCP for line-delimited byte streams.
//!
//! # Architecture
//!
//! 1. **Transport** (`mcp::transport`) - Reads and writes one line per frame
//! 2. **Codec** (`mcp::codec`) - Classifies and validates JSON-RPC frames
//! 3. **Protocol Engine** (`mcp::engine`) - Ids, correlation, connection state
//! 4. **Dispatcher / Caller** (`mcp::server`, `mcp::client`) - The MCP methods
//!
//! Built-in tools live in `tools`; `config` holds the command-line surface.

pub mod config;
pub mod error;
pub mod mcp;
pub mod metrics;
pub mod tools;

pub use error::{Error, Result};

/// Version reported in `serverInfo`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
