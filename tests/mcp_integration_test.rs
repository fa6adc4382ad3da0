//! MCP Server Integration Tests
//!
//! These tests spawn the server binary and talk JSON-RPC to it over stdio.

#![allow(deprecated)] // Allow deprecated cargo_bin for now

use assert_cmd::cargo::CommandCargoExt;
use assert_cmd::Command as AssertCommand;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use tempfile::TempDir;

/// MCP Test Client that communicates with the server via stdio
struct McpTestClient {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    request_id: i64,
}

impl McpTestClient {
    /// Spawn a new MCP server and connect to it
    fn spawn(args: &[&str]) -> Result<Self, Box<dyn std::error::Error>> {
        let mut child = Command::cargo_bin("mcp-engine")?
            .args(args)
            .env_remove("MCP_ENGINE_RESOURCES")
            .env_remove("MCP_ENGINE_NAME")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let stdin = child.stdin.take().expect("Failed to get stdin");
        let stdout = BufReader::new(child.stdout.take().expect("Failed to get stdout"));

        Ok(Self {
            child,
            stdin: Some(stdin),
            stdout,
            request_id: 0,
        })
    }

    /// Write one raw line to the server
    fn send_line(&mut self, line: &str) -> Result<(), Box<dyn std::error::Error>> {
        let stdin = self.stdin.as_mut().ok_or("stdin closed")?;
        writeln!(stdin, "{}", line)?;
        stdin.flush()?;
        Ok(())
    }

    /// Write raw bytes to the server
    fn send_bytes(&mut self, bytes: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
        let stdin = self.stdin.as_mut().ok_or("stdin closed")?;
        stdin.write_all(bytes)?;
        stdin.flush()?;
        Ok(())
    }

    /// Read one line from the server and parse it
    fn read_message(&mut self) -> Result<Value, Box<dyn std::error::Error>> {
        let mut line = String::new();
        self.stdout.read_line(&mut line)?;
        Ok(serde_json::from_str(&line)?)
    }

    /// Send a JSON-RPC request and get the response
    fn request(&mut self, method: &str, params: Value) -> Result<Value, Box<dyn std::error::Error>> {
        self.request_id += 1;
        let request = json!({
            "jsonrpc": "2.0",
            "id": self.request_id,
            "method": method,
            "params": params
        });

        self.send_line(&serde_json::to_string(&request)?)?;
        self.read_message()
    }

    fn initialize(&mut self) -> Result<Value, Box<dyn std::error::Error>> {
        let response = self.request(
            "initialize",
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": { "name": "test-client", "version": "1.0.0" }
            }),
        )?;
        self.send_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)?;
        Ok(response)
    }

    fn list_tools(&mut self) -> Result<Value, Box<dyn std::error::Error>> {
        self.request("tools/list", json!({}))
    }

    fn call_tool(&mut self, name: &str, arguments: Value) -> Result<Value, Box<dyn std::error::Error>> {
        self.request("tools/call", json!({ "name": name, "arguments": arguments }))
    }

    /// Close stdin and wait for the server to exit
    fn finish(mut self) -> Result<std::process::ExitStatus, Box<dyn std::error::Error>> {
        drop(self.stdin.take());
        Ok(self.child.wait()?)
    }
}

impl Drop for McpTestClient {
    fn drop(&mut self) {
        let _ = self.child.kill();
    }
}

// ============================================================================
// Integration Tests
// ============================================================================

#[test]
fn test_binary_help() {
    AssertCommand::cargo_bin("mcp-engine")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Model Context Protocol"));
}

#[test]
fn test_binary_version() {
    AssertCommand::cargo_bin("mcp-engine")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_eof_exits_cleanly() {
    AssertCommand::cargo_bin("mcp-engine")
        .unwrap()
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_missing_resource_fails_startup() {
    AssertCommand::cargo_bin("mcp-engine")
        .unwrap()
        .args(["--resource", "/definitely/not/here.txt"])
        .write_stdin("")
        .assert()
        .failure();
}

#[test]
fn test_initialize() {
    let mut client = McpTestClient::spawn(&[]).expect("Failed to spawn server");

    let response = client.initialize().expect("initialize failed");
    assert_eq!(response["jsonrpc"], "2.0");
    assert_eq!(response["id"], 1);
    assert_eq!(response["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(response["result"]["serverInfo"]["name"], "mcp-engine");
    assert!(response["result"]["capabilities"]["tools"].is_object());
    assert!(response["result"]["capabilities"]["prompts"].is_object());
    assert!(response["result"]["capabilities"].get("resources").is_none());

    let status = client.finish().expect("wait failed");
    assert!(status.success());
}

#[test]
fn test_list_and_call_echo() {
    let mut client = McpTestClient::spawn(&[]).expect("Failed to spawn server");
    client.initialize().expect("initialize failed");

    let tools = client.list_tools().expect("tools/list failed");
    let names: Vec<_> = tools["result"]["tools"]
        .as_array()
        .expect("tools array")
        .iter()
        .map(|t| t["name"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(names, vec!["add", "echo"]);

    let response = client
        .call_tool("echo", json!({ "message": "hi" }))
        .expect("tools/call failed");
    assert_eq!(
        response,
        json!({ "jsonrpc": "2.0", "id": 3, "result": { "echoed": "hi" } })
    );
}

#[test]
fn test_malformed_line_is_skipped() {
    let mut client = McpTestClient::spawn(&[]).expect("Failed to spawn server");

    client.send_line("this is not json").unwrap();
    client.send_line("").unwrap();
    client
        .send_line(r#"{"jsonrpc":"2.0","id":"a","method":"ping"}"#)
        .unwrap();

    let response = client.read_message().expect("no response");
    assert_eq!(response, json!({ "jsonrpc": "2.0", "id": "a", "result": {} }));
}

#[test]
fn test_non_utf8_line_is_skipped() {
    let mut client = McpTestClient::spawn(&[]).expect("Failed to spawn server");

    client.send_bytes(b"\xff\xfe garbage\n").unwrap();
    client
        .send_line(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#)
        .unwrap();

    let response = client.read_message().expect("no response");
    assert_eq!(response, json!({ "jsonrpc": "2.0", "id": 1, "result": {} }));

    let status = client.finish().expect("wait failed");
    assert!(status.success());
}

#[test]
fn test_unknown_method() {
    let mut client = McpTestClient::spawn(&[]).expect("Failed to spawn server");

    let response = client.request("frobnicate", json!({})).unwrap();
    assert_eq!(response["id"], 1);
    assert_eq!(response["error"]["code"], -32601);
    assert!(response.get("result").is_none());
}

#[test]
fn test_call_tool_without_name() {
    let mut client = McpTestClient::spawn(&[]).expect("Failed to spawn server");

    let response = client.request("tools/call", json!({})).unwrap();
    assert_eq!(response["error"]["code"], -32602);

    // The server keeps serving after a failed call.
    let response = client.call_tool("add", json!({ "a": 2, "b": 40 })).unwrap();
    assert_eq!(response["result"]["content"][0]["text"], "42");
}

#[test]
fn test_no_builtins() {
    let mut client = McpTestClient::spawn(&["--no-builtins"]).expect("Failed to spawn server");

    let init = client.initialize().unwrap();
    assert_eq!(init["result"]["capabilities"], json!({}));

    let tools = client.list_tools().unwrap();
    assert_eq!(tools["result"]["tools"], json!([]));
}

#[test]
fn test_file_resource() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("notes.md");
    std::fs::write(&path, "# Notes\nremember the milk\n").expect("Failed to write notes.md");

    let path_arg = path.to_string_lossy().to_string();
    let mut client =
        McpTestClient::spawn(&["--name", "files", "--resource", &path_arg]).expect("Failed to spawn server");

    let init = client.initialize().unwrap();
    assert_eq!(init["result"]["serverInfo"]["name"], "files");
    assert!(init["result"]["capabilities"]["resources"].is_object());

    let list = client.request("resources/list", json!({})).unwrap();
    let resource = &list["result"]["resources"][0];
    let uri = resource["uri"].as_str().expect("uri").to_string();
    assert!(uri.starts_with("file://"));
    assert_eq!(resource["name"], "notes.md");
    assert_eq!(resource["mimeType"], "text/markdown");

    let read = client
        .request("resources/read", json!({ "uri": uri }))
        .unwrap();
    assert_eq!(read["result"]["contents"][0]["text"], "# Notes\nremember the milk\n");

    let missing = client
        .request("resources/read", json!({ "uri": "file:///nope" }))
        .unwrap();
    assert_eq!(missing["error"]["code"], -32602);
}

#[test]
fn test_notification_gets_no_reply() {
    let mut client = McpTestClient::spawn(&[]).expect("Failed to spawn server");

    client
        .send_line(r#"{"jsonrpc":"2.0","method":"notifications/cancelled","params":{"requestId":1}}"#)
        .unwrap();
    let response = client.request("ping", json!({})).unwrap();
    assert_eq!(response["id"], 1);
    assert_eq!(response["result"], json!({}));
}
