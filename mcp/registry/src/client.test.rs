use super::*;
use bifrost_protocol::McpConnectionType;

fn stdio_config(command: &str) -> McpClientConfig {
    McpClientConfig::new("client_1", "git", McpConnectionType::Stdio, command)
}

#[test]
fn test_new_client_is_connecting() {
    let client = McpClient::new(stdio_config("/usr/local/bin/git-mcp"));
    assert_eq!(client.state(), McpClientState::Connecting);
    assert!(client.tools().is_empty());
}

#[tokio::test]
async fn test_failed_connect_enters_error_state() {
    let client = McpClient::new(stdio_config("/nonexistent/mcp-server-binary"));
    let result = client.connect().await;
    assert!(result.is_err());
    assert_eq!(client.state(), McpClientState::Error);
}

#[tokio::test]
async fn test_failed_reconnect_drops_tool_registrations() {
    let client = McpClient::new(stdio_config("/nonexistent/mcp-server-binary"));
    let _ = client.connect().await;
    assert!(client.reconnect().await.is_err());
    assert!(client.tools().is_empty());
}

#[tokio::test]
async fn test_close_is_terminal() {
    let client = McpClient::new(stdio_config("/nonexistent/mcp-server-binary"));
    let _ = client.connect().await;
    client.close().await;
    assert_eq!(client.state(), McpClientState::Disconnected);
}

#[tokio::test]
async fn test_call_tool_without_connection_fails() {
    let client = McpClient::new(stdio_config("/usr/local/bin/git-mcp"));
    let err = client
        .call_tool("status", serde_json::json!({}), None)
        .await
        .expect_err("not connected");
    assert_eq!(err.kind, bifrost_error::ErrorKind::Operation);
}
