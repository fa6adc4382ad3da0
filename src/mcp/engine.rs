//! JSON-RPC protocol engine.
//!
//! Sits between a [`Transport`] and the domain layer. The engine owns the
//! per-connection state: the next request id, the set of requests still
//! waiting for a reply, and whether the connection is still open.
//!
//! Requests are correlated with responses by id. A response for another
//! outstanding request that arrives while one id is awaited is parked until
//! its own awaiter asks for it; a response nobody is waiting for is dropped.

use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::mcp::codec::{self, Message};
use crate::mcp::protocol::{
    error_codes, JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RequestId,
};
use crate::mcp::transport::Transport;

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    Closed,
}

/// Protocol engine for one connection.
pub struct ProtocolEngine<T: Transport> {
    transport: T,
    state: ConnectionState,
    next_id: i64,
    /// Outstanding request ids mapped to the method they called.
    pending: HashMap<RequestId, String>,
    /// Responses that arrived while a different id was being awaited.
    parked: HashMap<RequestId, JsonRpcResponse>,
    skipped_frames: u64,
}

impl<T: Transport> ProtocolEngine<T> {
    /// Create an engine on an already-open transport.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: ConnectionState::Open,
            next_id: 1,
            pending: HashMap::new(),
            parked: HashMap::new(),
            skipped_frames: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// Number of requests still waiting for a response.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Number of inbound lines dropped because they failed to decode.
    pub fn skipped_frames(&self) -> u64 {
        self.skipped_frames
    }

    /// Send a request with a freshly allocated id and record it as pending.
    pub async fn send_request(&mut self, method: &str, params: Option<Value>) -> Result<RequestId> {
        let id = RequestId::Number(self.next_id);
        let request = JsonRpcRequest::new(id.clone(), method, params);

        self.send(&request.into()).await?;
        self.next_id += 1;
        self.pending.insert(id.clone(), method.to_string());
        debug!("Sent request: {} (id: {})", method, id);
        Ok(id)
    }

    /// Send a notification. Nothing is recorded.
    pub async fn send_notification(&mut self, method: &str, params: Option<Value>) -> Result<()> {
        self.send(&JsonRpcNotification::new(method, params).into())
            .await
    }

    /// Send a success response to an inbound request.
    pub async fn send_response(&mut self, id: RequestId, result: Value) -> Result<()> {
        self.send(&JsonRpcResponse::success(id, result).into()).await
    }

    /// Send an error response to an inbound request.
    pub async fn send_error(&mut self, id: RequestId, error: JsonRpcError) -> Result<()> {
        self.send(&JsonRpcResponse::failure(id, error).into()).await
    }

    /// Send a response that has already been built.
    pub async fn reply(&mut self, response: JsonRpcResponse) -> Result<()> {
        self.send(&response.into()).await
    }

    /// Receive the next structurally valid message.
    ///
    /// Blank lines and lines that fail to decode, including lines that are not
    /// valid UTF-8, are skipped.
    pub async fn receive(&mut self) -> Result<Message> {
        loop {
            let line = match self.read_line().await {
                Ok(line) => line,
                Err(Error::Decode(e)) => {
                    self.skipped_frames += 1;
                    warn!("Dropping unreadable frame: {}", e);
                    continue;
                }
                Err(e) => return Err(e),
            };
            if line.trim().is_empty() {
                continue;
            }

            match codec::decode(&line) {
                Ok(message) => {
                    trace!("Decoded {}", message.kind());
                    return Ok(message);
                }
                Err(e) => {
                    self.skipped_frames += 1;
                    warn!("Dropping malformed frame ({}): {}", e, line);
                }
            }
        }
    }

    /// Wait for the response to an outstanding request.
    ///
    /// Frames that are not the awaited response are handled here and never
    /// returned: responses for other outstanding ids are parked, stale
    /// responses are dropped, peer requests are answered (`ping` with an empty
    /// result, anything else with "Method not found") and peer notifications
    /// are dropped.
    pub async fn await_response(&mut self, id: &RequestId) -> Result<JsonRpcResponse> {
        if let Some(response) = self.parked.remove(id) {
            self.pending.remove(id);
            return Ok(response);
        }
        if !self.pending.contains_key(id) {
            return Err(Error::UnknownRequestId(id.clone()));
        }

        loop {
            match self.receive().await? {
                Message::Response(response) if &response.id == id => {
                    self.pending.remove(id);
                    return Ok(response);
                }
                Message::Response(response) => {
                    if self.pending.contains_key(&response.id) {
                        debug!("Parking response for id {}", response.id);
                        self.parked.insert(response.id.clone(), response);
                    } else {
                        warn!("Discarding response for unknown id {}", response.id);
                    }
                }
                Message::Request(request) => {
                    self.answer_peer_request(request).await?;
                }
                Message::Notification(notif) => {
                    debug!(
                        "Dropping notification {} while awaiting id {}",
                        notif.method, id
                    );
                }
            }
        }
    }

    /// Close the connection. Outstanding requests are abandoned.
    pub async fn close(&mut self) -> Result<()> {
        if self.state == ConnectionState::Closed {
            return Ok(());
        }
        self.state = ConnectionState::Closed;
        self.pending.clear();
        self.parked.clear();
        self.transport.close().await
    }

    async fn answer_peer_request(&mut self, request: JsonRpcRequest) -> Result<()> {
        debug!(
            "Peer request {} (id: {}) while awaiting a response",
            request.method, request.id
        );
        if request.method == "ping" {
            self.send_response(request.id, json!({})).await
        } else {
            let error = JsonRpcError::new(
                error_codes::METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            );
            self.send_error(request.id, error).await
        }
    }

    async fn send(&mut self, message: &Message) -> Result<()> {
        if self.state == ConnectionState::Closed {
            return Err(Error::ConnectionClosed);
        }

        let line = codec::encode(message)?;
        if let Err(e) = self.transport.write_line(&line).await {
            self.fail();
            return Err(e);
        }
        Ok(())
    }

    async fn read_line(&mut self) -> Result<String> {
        if self.state == ConnectionState::Closed {
            return Err(Error::ConnectionClosed);
        }

        match self.transport.read_line().await {
            Ok(line) => Ok(line),
            Err(e) if e.is_fatal() => {
                self.fail();
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    fn fail(&mut self) {
        self.state = ConnectionState::Closed;
        self.pending.clear();
        self.parked.clear();
    }
}
