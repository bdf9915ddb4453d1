use super::*;
use bifrost_protocol::McpConnectionType;
use serde_json::json;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::body_partial_json;
use wiremock::matchers::method;

async fn start_mock_mcp_server(tools: Value) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "initialize"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {"protocolVersion": "2025-03-26", "capabilities": {}},
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_partial_json(
            json!({"method": "notifications/initialized"}),
        ))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "tools/list"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 2,
            "result": {"tools": tools},
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "tools/call"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 3,
            "result": {"content": [{"type": "text", "text": "clean working tree"}]},
        })))
        .mount(&server)
        .await;

    server
}

fn http_config(id: &str, name: &str, url: &str) -> McpClientConfig {
    McpClientConfig::new(id, name, McpConnectionType::HttpSse, url)
}

#[tokio::test]
async fn test_add_client_discovers_prefixed_tools() {
    let server = start_mock_mcp_server(json!([
        {"name": "status", "description": "working tree status", "inputSchema": {"type": "object"}},
        {"name": "log", "inputSchema": {"type": "object"}},
    ]))
    .await;

    let registry = McpRegistry::new();
    registry
        .add_client(http_config("c1", "git", &server.uri()))
        .await
        .expect("add client");

    let tools = registry.get_available_tools(&RequestContext::new());
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["git-log", "git-status"]);
}

#[tokio::test]
async fn test_duplicate_ids_and_names_rejected() {
    let server = start_mock_mcp_server(json!([])).await;
    let registry = McpRegistry::new();

    registry
        .add_client(http_config("c1", "git", &server.uri()))
        .await
        .expect("add client");

    let dup_id = registry
        .add_client(http_config("c1", "other", &server.uri()))
        .await
        .expect_err("duplicate id");
    assert_eq!(dup_id.kind, bifrost_error::ErrorKind::Validation);

    let dup_name = registry
        .add_client(http_config("c2", "git", &server.uri()))
        .await
        .expect_err("duplicate name");
    assert_eq!(dup_name.kind, bifrost_error::ErrorKind::Validation);
}

#[tokio::test]
async fn test_oauth_config_is_parked_until_flow_completes() {
    let server = start_mock_mcp_server(json!([])).await;
    let registry = McpRegistry::new();

    let mut config = http_config("c1", "git", &server.uri());
    config.auth = McpAuth::Oauth {
        flow_id: "flow_42".to_string(),
    };

    registry.add_client(config).await.expect("park config");
    // Nothing is connected yet.
    assert!(registry.get_clients().is_empty());

    registry
        .complete_oauth("flow_42")
        .await
        .expect("complete oauth");
    assert_eq!(registry.get_clients().len(), 1);

    let missing = registry.complete_oauth("flow_42").await;
    assert!(missing.is_err(), "flow consumed on completion");
}

#[tokio::test]
async fn test_wildcard_include_filter_scopes_to_one_client() {
    let git_server = start_mock_mcp_server(json!([
        {"name": "status", "inputSchema": {}},
        {"name": "log", "inputSchema": {}},
    ]))
    .await;
    let search_server = start_mock_mcp_server(json!([
        {"name": "lookup", "inputSchema": {}},
    ]))
    .await;

    let registry = McpRegistry::new();
    registry
        .add_client(http_config("c1", "git", &git_server.uri()))
        .await
        .expect("add git");
    registry
        .add_client(http_config("c2", "search", &search_server.uri()))
        .await
        .expect("add search");

    let ctx = RequestContext::new().with_value(MCP_INCLUDE_TOOLS_KEY, json!(["git-*"]));
    let tools = registry.get_available_tools(&ctx);
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["git-log", "git-status"]);
}

#[tokio::test]
async fn test_execute_list_filters_available_tools() {
    let server = start_mock_mcp_server(json!([
        {"name": "status", "inputSchema": {}},
        {"name": "push", "inputSchema": {}},
    ]))
    .await;

    let registry = McpRegistry::new();
    let mut config = http_config("c1", "git", &server.uri());
    config.tools_to_execute = vec!["status".to_string()];
    registry.add_client(config).await.expect("add client");

    let tools = registry.get_available_tools(&RequestContext::new());
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["git-status"]);
}

#[tokio::test]
async fn test_execute_tool_returns_tool_message() {
    let server = start_mock_mcp_server(json!([
        {"name": "status", "inputSchema": {}},
    ]))
    .await;

    let registry = McpRegistry::new();
    registry
        .add_client(http_config("c1", "git", &server.uri()))
        .await
        .expect("add client");

    let call = ToolCall::new("call_1", "git-status", json!({}));
    let message = registry
        .execute_tool(&RequestContext::new(), &call)
        .await
        .expect("execute");

    assert_eq!(message.role, bifrost_protocol::Role::Tool);
    match &message.content[0] {
        bifrost_protocol::ContentBlock::ToolResult {
            tool_use_id,
            content,
            is_error,
        } => {
            assert_eq!(tool_use_id, "call_1");
            assert_eq!(content.to_text(), "clean working tree");
            assert!(!*is_error);
        }
        other => panic!("expected tool result block, got {other:?}"),
    }
}

#[tokio::test]
async fn test_execute_tool_rejections() {
    let server = start_mock_mcp_server(json!([
        {"name": "status", "inputSchema": {}},
    ]))
    .await;

    let registry = McpRegistry::new();
    let mut config = http_config("c1", "git", &server.uri());
    config.tools_to_execute = vec!["status".to_string()];
    registry.add_client(config).await.expect("add client");

    // Unprefixed name.
    let err = registry
        .execute_tool(&RequestContext::new(), &ToolCall::new("c", "bare", json!({})))
        .await
        .expect_err("bare name");
    assert_eq!(err.kind, bifrost_error::ErrorKind::Validation);

    // Unknown client.
    let err = registry
        .execute_tool(
            &RequestContext::new(),
            &ToolCall::new("c", "hg-status", json!({})),
        )
        .await
        .expect_err("unknown client");
    assert_eq!(err.kind, bifrost_error::ErrorKind::Validation);

    // Tool outside the execute allow-list.
    let err = registry
        .execute_tool(
            &RequestContext::new(),
            &ToolCall::new("c", "git-push", json!({})),
        )
        .await
        .expect_err("not allowed");
    assert_eq!(err.kind, bifrost_error::ErrorKind::Validation);

    // Tool excluded by the request filter.
    let ctx = RequestContext::new().with_value(MCP_INCLUDE_TOOLS_KEY, json!(["search-*"]));
    let err = registry
        .execute_tool(&ctx, &ToolCall::new("c", "git-status", json!({})))
        .await
        .expect_err("filtered");
    assert_eq!(err.kind, bifrost_error::ErrorKind::Validation);
}

#[test]
fn test_normalize_tool_result() {
    let text_result = json!({"content": [
        {"type": "text", "text": "line one"},
        {"type": "text", "text": "line two"},
    ]});
    assert_eq!(
        normalize_tool_result(&text_result).to_text(),
        "line one\nline two"
    );

    // Mixed content falls back to the raw JSON.
    let mixed = json!({"content": [
        {"type": "text", "text": "caption"},
        {"type": "image", "data": "aGk=", "mimeType": "image/png"},
    ]});
    let normalized = normalize_tool_result(&mixed);
    assert!(matches!(normalized, ToolResultContent::Json(_)));
}
