//! Model Context Protocol (MCP) implementation.
//!
//! # Architecture
//!
//! - `transport` - Line-oriented byte streams (stdio, in-memory pipes)
//! - `codec` - JSON-RPC 2.0 frame encoding and validation
//! - `engine` - Request ids, response correlation, connection state
//! - `server` - Dispatch of inbound requests to the registries
//! - `client` - Typed outbound calls
//! - `handler`, `resources`, `prompts` - Registries and their handler traits
//! - `protocol` - Wire types

pub mod client;
pub mod codec;
pub mod engine;
pub mod handler;
pub mod prompts;
pub mod protocol;
pub mod resources;
pub mod server;
pub mod transport;

pub use client::McpClient;
pub use codec::Message;
pub use engine::{ConnectionState, ProtocolEngine};
pub use handler::{ToolHandler, ToolRegistry};
pub use prompts::{PromptHandler, PromptRegistry};
pub use protocol::*;
pub use resources::{ResourceHandler, ResourceRegistry};
pub use server::McpServer;
pub use transport::{StdioTransport, StreamTransport, Transport};
