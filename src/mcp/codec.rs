//! JSON-RPC envelope codec.
//!
//! One [`Message`] is one line of JSON on the wire. Decoding classifies a frame
//! by its members: a `method` makes it a request (with `id`) or a notification
//! (without); anything else must be a response carrying exactly one of
//! `result` or `error`.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::mcp::protocol::{
    JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RequestId,
    ResponsePayload, JSONRPC_VERSION,
};

/// A message that can be sent or received.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
    Response(JsonRpcResponse),
}

impl Message {
    /// Short label used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Request(_) => "request",
            Self::Notification(_) => "notification",
            Self::Response(_) => "response",
        }
    }
}

impl From<JsonRpcRequest> for Message {
    fn from(req: JsonRpcRequest) -> Self {
        Self::Request(req)
    }
}

impl From<JsonRpcNotification> for Message {
    fn from(notif: JsonRpcNotification) -> Self {
        Self::Notification(notif)
    }
}

impl From<JsonRpcResponse> for Message {
    fn from(res: JsonRpcResponse) -> Self {
        Self::Response(res)
    }
}

/// Encode a message as a single line of JSON (without the trailing newline).
pub fn encode(message: &Message) -> Result<String> {
    let json = match message {
        Message::Request(req) => serde_json::to_string(req)?,
        Message::Notification(notif) => serde_json::to_string(notif)?,
        Message::Response(res) => serde_json::to_string(res)?,
    };
    Ok(json)
}

/// Decode one line of JSON into a message.
pub fn decode(line: &str) -> Result<Message> {
    let value: Value =
        serde_json::from_str(line).map_err(|e| Error::Decode(format!("invalid JSON: {}", e)))?;

    let Value::Object(mut obj) = value else {
        return Err(Error::Decode("frame is not a JSON object".to_string()));
    };

    match obj.remove("jsonrpc") {
        Some(Value::String(v)) if v == JSONRPC_VERSION => {}
        Some(other) => {
            return Err(Error::Decode(format!(
                "unsupported jsonrpc version: {}",
                other
            )))
        }
        None => return Err(Error::Decode("missing jsonrpc member".to_string())),
    }

    if let Some(method) = obj.remove("method") {
        let method = match method {
            Value::String(m) if !m.is_empty() => m,
            Value::String(_) => return Err(Error::Decode("empty method name".to_string())),
            _ => return Err(Error::Decode("method must be a string".to_string())),
        };
        let params = obj.remove("params");

        return match obj.remove("id") {
            Some(id) => Ok(Message::Request(JsonRpcRequest {
                jsonrpc: JSONRPC_VERSION.to_string(),
                id: decode_id(id)?,
                method,
                params,
            })),
            None => Ok(Message::Notification(JsonRpcNotification {
                jsonrpc: JSONRPC_VERSION.to_string(),
                method,
                params,
            })),
        };
    }

    let id = obj
        .remove("id")
        .ok_or_else(|| Error::Decode("response without id".to_string()))
        .and_then(decode_id)?;

    let payload = match (obj.remove("result"), obj.remove("error")) {
        (Some(result), None) => ResponsePayload::Result(result),
        (None, Some(error)) => ResponsePayload::Error(decode_error(error)?),
        (Some(_), Some(_)) => {
            return Err(Error::Decode(
                "response carries both result and error".to_string(),
            ))
        }
        (None, None) => {
            return Err(Error::Decode(
                "response carries neither result nor error".to_string(),
            ))
        }
    };

    Ok(Message::Response(JsonRpcResponse {
        jsonrpc: JSONRPC_VERSION.to_string(),
        id,
        payload,
    }))
}

fn decode_id(id: Value) -> Result<RequestId> {
    match id {
        Value::String(s) => Ok(RequestId::String(s)),
        Value::Number(n) => n
            .as_i64()
            .map(RequestId::Number)
            .ok_or_else(|| Error::Decode(format!("id must be an integer: {}", n))),
        Value::Null => Err(Error::Decode("id must not be null".to_string())),
        other => Err(Error::Decode(format!("invalid id: {}", other))),
    }
}

fn decode_error(error: Value) -> Result<JsonRpcError> {
    let Value::Object(mut obj) = error else {
        return Err(Error::Decode("error member must be an object".to_string()));
    };

    let code = obj
        .remove("code")
        .and_then(|c| c.as_i64())
        .and_then(|c| i32::try_from(c).ok())
        .ok_or_else(|| Error::Decode("error code must be an integer".to_string()))?;
    let message = match obj.remove("message") {
        Some(Value::String(m)) => m,
        _ => return Err(Error::Decode("error message must be a string".to_string())),
    };

    Ok(JsonRpcError {
        code,
        message,
        data: obj.remove("data"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::error_codes;
    use serde_json::json;

    fn roundtrip(message: Message) {
        let line = encode(&message).unwrap();
        assert!(!line.contains('\n'), "encoded frame spans lines: {}", line);
        assert_eq!(decode(&line).unwrap(), message);
    }

    #[test]
    fn test_roundtrip_each_shape() {
        roundtrip(JsonRpcRequest::new(1, "tools/list", None).into());
        roundtrip(
            JsonRpcRequest::new(
                "abc",
                "tools/call",
                Some(json!({"name": "echo", "arguments": {"message": "line1\nline2"}})),
            )
            .into(),
        );
        roundtrip(JsonRpcNotification::new("notifications/initialized", None).into());
        roundtrip(JsonRpcNotification::new("notifications/cancelled", Some(json!([1, 2]))).into());
        roundtrip(JsonRpcResponse::success(RequestId::Number(9), json!({"ok": true})).into());
        roundtrip(JsonRpcResponse::success(RequestId::Number(10), Value::Null).into());
        roundtrip(
            JsonRpcResponse::failure(
                RequestId::String("x".to_string()),
                JsonRpcError::new(error_codes::INTERNAL_ERROR, "boom").with_data(json!("trace")),
            )
            .into(),
        );
    }

    #[test]
    fn test_params_null_preserved() {
        roundtrip(JsonRpcRequest::new(2, "ping", Some(Value::Null)).into());
    }

    #[test]
    fn test_encode_tags_version() {
        let line = encode(&JsonRpcNotification::new("x", None).into()).unwrap();
        assert_eq!(line, r#"{"jsonrpc":"2.0","method":"x"}"#);
    }

    #[test]
    fn test_classify_request_and_notification() {
        let req = decode(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#).unwrap();
        assert!(matches!(req, Message::Request(ref r) if r.id == RequestId::Number(1)));

        let notif = decode(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).unwrap();
        assert_eq!(notif.kind(), "notification");
    }

    #[test]
    fn test_string_and_number_ids_kept_apart() {
        let Message::Request(a) = decode(r#"{"jsonrpc":"2.0","id":5,"method":"m"}"#).unwrap()
        else {
            panic!("expected request");
        };
        let Message::Request(b) = decode(r#"{"jsonrpc":"2.0","id":"5","method":"m"}"#).unwrap()
        else {
            panic!("expected request");
        };
        assert_eq!(a.id, RequestId::Number(5));
        assert_eq!(b.id, RequestId::String("5".to_string()));
    }

    #[test]
    fn test_null_result_is_success() {
        let msg = decode(r#"{"jsonrpc":"2.0","id":1,"result":null}"#).unwrap();
        let Message::Response(res) = msg else {
            panic!("expected response");
        };
        assert_eq!(res.result(), Some(&Value::Null));
    }

    #[test]
    fn test_decode_error_response() {
        let msg = decode(
            r#"{"jsonrpc":"2.0","id":3,"error":{"code":-32601,"message":"Method not found","data":{"method":"x"}}}"#,
        )
        .unwrap();
        let Message::Response(res) = msg else {
            panic!("expected response");
        };
        let err = res.error().unwrap();
        assert_eq!(err.code, error_codes::METHOD_NOT_FOUND);
        assert_eq!(err.data, Some(json!({"method": "x"})));
    }

    #[test]
    fn test_rejects_malformed_frames() {
        let cases = [
            "not json",
            "[1,2,3]",
            r#"{"id":1,"method":"m"}"#,
            r#"{"jsonrpc":"1.0","id":1,"method":"m"}"#,
            r#"{"jsonrpc":"2.0","id":1,"method":""}"#,
            r#"{"jsonrpc":"2.0","id":1,"method":42}"#,
            r#"{"jsonrpc":"2.0","id":null,"method":"m"}"#,
            r#"{"jsonrpc":"2.0","id":1.5,"method":"m"}"#,
            r#"{"jsonrpc":"2.0","id":true,"method":"m"}"#,
            r#"{"jsonrpc":"2.0","id":1}"#,
            r#"{"jsonrpc":"2.0","id":1,"result":1,"error":{"code":1,"message":"m"}}"#,
            r#"{"jsonrpc":"2.0","result":1}"#,
            r#"{"jsonrpc":"2.0","id":1,"error":"bad"}"#,
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":"x","message":"m"}}"#,
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":1}}"#,
        ];

        for case in cases {
            match decode(case) {
                Err(Error::Decode(_)) => {}
                other => panic!("expected decode error for {}, got {:?}", case, other),
            }
        }
    }
}
