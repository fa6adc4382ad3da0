//! Basic tools: echo and add.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::error::Result;
use crate::mcp::handler::{error_result, get_number_arg, get_string_arg, success_result, ToolHandler};
use crate::mcp::protocol::Tool;
use crate::tool_schema;

/// Echo tool. Returns the message it was given.
pub struct EchoTool;

#[async_trait]
impl ToolHandler for EchoTool {
    fn definition(&self) -> Tool {
        let mut schema = tool_schema! {
            "message": {
                "type": "string",
                "description": "The message to echo back"
            }
        };
        schema["required"] = json!(["message"]);

        Tool {
            name: "echo".to_string(),
            description: Some("Echo a message back to the caller.".to_string()),
            input_schema: schema,
        }
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<Value> {
        let message = get_string_arg(&args, "message")?;
        Ok(json!({ "echoed": message }))
    }
}

/// Add tool. Sums two numbers.
pub struct AddTool;

#[async_trait]
impl ToolHandler for AddTool {
    fn definition(&self) -> Tool {
        let mut schema = tool_schema! {
            "a": { "type": "number", "description": "First addend" },
            "b": { "type": "number", "description": "Second addend" }
        };
        schema["required"] = json!(["a", "b"]);

        Tool {
            name: "add".to_string(),
            description: Some("Add two numbers.".to_string()),
            input_schema: schema,
        }
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<Value> {
        // Integers stay exact; anything else is summed as f64.
        let ints = (
            args.get("a").and_then(Value::as_i64),
            args.get("b").and_then(Value::as_i64),
        );
        if let (Some(a), Some(b)) = ints {
            return match a.checked_add(b) {
                Some(sum) => success_result(sum.to_string()),
                None => error_result(format!("{} + {} overflows", a, b)),
            };
        }

        let a = get_number_arg(&args, "a")?;
        let b = get_number_arg(&args, "b")?;
        success_result((a + b).to_string())
    }
}
