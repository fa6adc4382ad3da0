//! Error types for the MCP engine.

use thiserror::Error;

use crate::mcp::protocol::{error_codes, JsonRpcError, RequestId};

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the engine.
#[derive(Error, Debug)]
pub enum Error {
    // ===== Transport Errors =====
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("End of stream")]
    Eof,

    #[error("Connection closed")]
    ConnectionClosed,

    // ===== Codec Errors =====
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // ===== Dispatch Errors =====
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Prompt not found: {0}")]
    PromptNotFound(String),

    // ===== Caller Errors =====
    #[error("Server returned error {}: {}", .0.code, .0.message)]
    Rpc(JsonRpcError),

    #[error("No outstanding request with id {0}")]
    UnknownRequestId(RequestId),

    // ===== Internal Errors =====
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// The JSON-RPC error code this error is reported with on the wire.
    pub fn rpc_code(&self) -> i32 {
        match self {
            Self::Decode(_) => error_codes::PARSE_ERROR,
            Self::MethodNotFound(_) => error_codes::METHOD_NOT_FOUND,
            Self::InvalidParams(_)
            | Self::ToolNotFound(_)
            | Self::ResourceNotFound(_)
            | Self::PromptNotFound(_) => error_codes::INVALID_PARAMS,
            Self::Rpc(err) => err.code,
            _ => error_codes::INTERNAL_ERROR,
        }
    }

    /// Build the wire error object for this error.
    pub fn to_rpc_error(&self) -> JsonRpcError {
        match self {
            Self::Rpc(err) => err.clone(),
            other => JsonRpcError::new(other.rpc_code(), other.to_string()),
        }
    }

    /// Whether this error ends the connection it was raised on.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Eof | Self::ConnectionClosed)
    }
}
