//! Client/server round trips over an in-memory pipe.

use serde_json::json;
use std::collections::HashMap;
use tokio::io::{duplex, split, DuplexStream, ReadHalf, WriteHalf};
use tokio::task::JoinHandle;

use mcp_engine::mcp::handler::ToolRegistry;
use mcp_engine::mcp::prompts::{PromptContent, PromptRegistry};
use mcp_engine::mcp::resources::{ResourceRegistry, TextResource};
use mcp_engine::mcp::{error_codes, Implementation, McpClient, McpServer, StreamTransport};
use mcp_engine::tools::register_builtin_tools;
use mcp_engine::{Error, Result};

type Client = McpClient<StreamTransport<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>>;

fn start() -> (Client, JoinHandle<Result<()>>) {
    let mut tools = ToolRegistry::new();
    register_builtin_tools(&mut tools);

    let mut resources = ResourceRegistry::new();
    resources.register(
        TextResource::new("memo://greeting", "greeting", "Hello from memory")
            .with_description("A canned greeting"),
    );

    let server = McpServer::new("pipe-server")
        .with_version("1.2.3")
        .with_tools(tools)
        .with_resources(resources)
        .with_prompts(PromptRegistry::with_builtins());

    let (client_end, server_end) = duplex(64 * 1024);
    let (sr, sw) = split(server_end);
    let handle = tokio::spawn(async move { server.run(StreamTransport::new(sr, sw)).await });

    let (cr, cw) = split(client_end);
    (McpClient::new(StreamTransport::new(cr, cw)), handle)
}

#[tokio::test]
async fn test_full_session() {
    let (mut client, server) = start();

    let init = client
        .initialize(Implementation::new("pipe-client", "0.0.1"))
        .await
        .unwrap();
    assert_eq!(init.server_info, Implementation::new("pipe-server", "1.2.3"));
    assert!(init.capabilities.tools.is_some());
    assert!(init.capabilities.resources.is_some());
    assert!(init.capabilities.prompts.is_some());

    client.ping().await.unwrap();

    let tools = client.list_tools().await.unwrap();
    let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["add", "echo"]);

    let echoed = client
        .call_tool("echo", json!({"message": "over the pipe"}))
        .await
        .unwrap();
    assert_eq!(echoed, json!({"echoed": "over the pipe"}));

    let resources = client.list_resources().await.unwrap();
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].description.as_deref(), Some("A canned greeting"));

    let read = client.read_resource("memo://greeting").await.unwrap();
    assert_eq!(read.contents[0].text.as_deref(), Some("Hello from memory"));

    let prompts = client.list_prompts().await.unwrap();
    assert_eq!(prompts[0].name, "summarize");

    let mut args = HashMap::new();
    args.insert("text".to_string(), "pipes carry bytes".to_string());
    let prompt = client.get_prompt("summarize", args).await.unwrap();
    match &prompt.messages[0].content {
        PromptContent::Text { text } => assert!(text.contains("pipes carry bytes")),
        other => panic!("unexpected content: {:?}", other),
    }

    client.close().await.unwrap();
    assert!(server.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_errors_keep_connection_usable() {
    let (mut client, server) = start();

    match client.request("frobnicate", None).await {
        Err(Error::Rpc(e)) => assert_eq!(e.code, error_codes::METHOD_NOT_FOUND),
        other => panic!("expected method not found, got {:?}", other),
    }

    match client.call_tool("missing", json!({})).await {
        Err(Error::Rpc(e)) => assert_eq!(e.code, error_codes::INVALID_PARAMS),
        other => panic!("expected invalid params, got {:?}", other),
    }

    match client.read_resource("memo://absent").await {
        Err(Error::Rpc(e)) => assert_eq!(e.code, error_codes::INVALID_PARAMS),
        other => panic!("expected invalid params, got {:?}", other),
    }

    match client.get_prompt("summarize", HashMap::new()).await {
        Err(Error::Rpc(e)) => {
            assert_eq!(e.code, error_codes::INVALID_PARAMS);
            assert!(e.message.contains("text"));
        }
        other => panic!("expected invalid params, got {:?}", other),
    }

    let sum = client.call_tool("add", json!({"a": 19, "b": 23})).await.unwrap();
    assert_eq!(sum["content"][0]["text"], "42");

    client.close().await.unwrap();
    assert!(server.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_notifications_do_not_produce_replies() {
    let (mut client, server) = start();

    client.notify("notifications/initialized", None).await.unwrap();
    client
        .notify("notifications/cancelled", Some(json!({"requestId": 99})))
        .await
        .unwrap();
    client.notify("custom/whatever", None).await.unwrap();

    client.ping().await.unwrap();
    assert_eq!(client.engine().pending_count(), 0);

    client.close().await.unwrap();
    assert!(server.await.unwrap().is_ok());
}
