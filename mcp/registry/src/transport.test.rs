use super::*;
use serde_json::json;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::Request;
use wiremock::Respond;
use wiremock::ResponseTemplate;
use wiremock::matchers::method;

fn stdio_config(command: &str, args: &[&str]) -> McpClientConfig {
    let mut config = McpClientConfig::new("c1", "echo", McpConnectionType::Stdio, command);
    config.args = args.iter().map(|a| a.to_string()).collect();
    config
}

fn http_config(url: &str) -> McpClientConfig {
    McpClientConfig::new("c1", "web", McpConnectionType::HttpSse, url)
}

fn ws_config(url: &str) -> McpClientConfig {
    McpClientConfig::new("c1", "sockets", McpConnectionType::Websocket, url)
}

// === stdio ===

#[tokio::test]
async fn test_stdio_round_trip_routes_by_id() {
    // `cat` echoes each request line back; the echoed frame carries the
    // request's own id, so it resolves the pending entry with no result.
    let transport = McpTransport::connect(&stdio_config("cat", &[]))
        .await
        .expect("spawn cat");

    let result = transport
        .request("ping", Some(json!({"n": 1})), Some(Duration::from_secs(5)))
        .await
        .expect("echoed reply");
    assert_eq!(result, Value::Null);

    transport.close().await;
}

#[tokio::test]
async fn test_stdio_concurrent_requests_multiplex() {
    let transport = McpTransport::connect(&stdio_config("cat", &[]))
        .await
        .expect("spawn cat");

    // Both requests share one stdin/stdout pair; the pending table must
    // route each echoed frame to its own caller.
    let (first, second) = tokio::join!(
        transport.request("first", None, Some(Duration::from_secs(5))),
        transport.request("second", None, Some(Duration::from_secs(5))),
    );
    first.expect("first reply");
    second.expect("second reply");

    transport.close().await;
}

#[tokio::test]
async fn test_stdio_notify_expects_no_reply() {
    let transport = McpTransport::connect(&stdio_config("cat", &[]))
        .await
        .expect("spawn cat");

    transport
        .notify("notifications/initialized", None)
        .await
        .expect("notification written");

    // The connection still serves requests afterwards.
    transport
        .request("ping", None, Some(Duration::from_secs(5)))
        .await
        .expect("reply after notification");

    transport.close().await;
}

#[tokio::test]
async fn test_stdio_request_times_out_without_reply() {
    // `sleep` never reads stdin or writes stdout.
    let transport = McpTransport::connect(&stdio_config("sleep", &["5"]))
        .await
        .expect("spawn sleep");

    let err = transport
        .request("ping", None, Some(Duration::from_millis(100)))
        .await
        .expect_err("no reply ever comes");
    assert_eq!(err.kind, bifrost_error::ErrorKind::Transport);
    assert!(err.error.message.contains("timed out"));

    transport.close().await;
}

#[tokio::test]
async fn test_stdio_spawn_failure() {
    let err = McpTransport::connect(&stdio_config("/nonexistent/mcp-server-binary", &[]))
        .await
        .expect_err("binary missing");
    assert_eq!(err.kind, bifrost_error::ErrorKind::Transport);
}

// === websocket ===

/// Serve JSON-RPC over websocket: requests are answered with an echo of
/// their method, notifications (no id) get no reply.
async fn spawn_ws_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };
                while let Some(Ok(message)) = ws.next().await {
                    match message {
                        WsMessage::Text(text) => {
                            let Ok(request) = serde_json::from_str::<Value>(&text) else {
                                continue;
                            };
                            let Some(id) = request.get("id").cloned() else {
                                continue;
                            };
                            let reply = json!({
                                "jsonrpc": "2.0",
                                "id": id,
                                "result": {"echo": request.get("method")},
                            });
                            if ws.send(WsMessage::Text(reply.to_string())).await.is_err() {
                                return;
                            }
                        }
                        WsMessage::Close(_) => return,
                        _ => {}
                    }
                }
            });
        }
    });

    format!("ws://{addr}")
}

#[tokio::test]
async fn test_websocket_round_trip() {
    let url = spawn_ws_server().await;
    let transport = McpTransport::connect(&ws_config(&url))
        .await
        .expect("connect");

    let result = transport
        .request("tools/list", None, Some(Duration::from_secs(5)))
        .await
        .expect("reply");
    assert_eq!(result["echo"], "tools/list");

    transport.close().await;
}

#[tokio::test]
async fn test_websocket_notification_does_not_desynchronize() {
    let url = spawn_ws_server().await;
    let transport = McpTransport::connect(&ws_config(&url))
        .await
        .expect("connect");

    // The notification gets no reply; the next request must still match
    // its own id.
    transport
        .notify("notifications/initialized", None)
        .await
        .expect("notification written");
    let result = transport
        .request("tools/call", None, Some(Duration::from_secs(5)))
        .await
        .expect("reply");
    assert_eq!(result["echo"], "tools/call");

    transport.close().await;
}

#[tokio::test]
async fn test_websocket_connect_failure() {
    let err = McpTransport::connect(&ws_config("ws://127.0.0.1:1"))
        .await
        .expect_err("nothing listening");
    assert_eq!(err.kind, bifrost_error::ErrorKind::Transport);
}

// === http ===

/// Answer the posted request with a JSON body echoing its id and method.
struct JsonEcho;

impl Respond for JsonEcho {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
        ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": body.get("id"),
            "result": {"echo": body.get("method")},
        }))
    }
}

/// Answer over a one-shot SSE body, preceded by an unrelated frame the
/// reader must skip while scanning for the posted request id.
struct SseEcho;

impl Respond for SseEcho {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
        let unrelated = json!({"jsonrpc": "2.0", "id": 0, "result": {}});
        let reply = json!({
            "jsonrpc": "2.0",
            "id": body.get("id"),
            "result": {"transport": "sse"},
        });
        ResponseTemplate::new(200)
            .set_body_raw(format!("data: {unrelated}\n\ndata: {reply}\n\n"), "text/event-stream")
    }
}

/// Answer with a JSON-RPC error object echoing the request id.
struct JsonRpcFailure;

impl Respond for JsonRpcFailure {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
        ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": body.get("id"),
            "error": {"code": -32601, "message": "method not found"},
        }))
    }
}

#[tokio::test]
async fn test_http_json_response_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(JsonEcho)
        .mount(&server)
        .await;

    let transport = McpTransport::connect(&http_config(&server.uri()))
        .await
        .expect("connect");
    let result = transport
        .request("tools/list", Some(json!({})), Some(Duration::from_secs(5)))
        .await
        .expect("reply");
    assert_eq!(result["echo"], "tools/list");
}

#[tokio::test]
async fn test_http_sse_response_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(SseEcho)
        .mount(&server)
        .await;

    let transport = McpTransport::connect(&http_config(&server.uri()))
        .await
        .expect("connect");
    let result = transport
        .request("tools/call", None, Some(Duration::from_secs(5)))
        .await
        .expect("reply from the sse body");
    assert_eq!(result["transport"], "sse");
}

#[tokio::test]
async fn test_http_sse_stream_ending_unanswered_is_transport_error() {
    let server = MockServer::start().await;
    // Only a frame for a foreign id; request ids start at 1, never 0.
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "data: {\"jsonrpc\":\"2.0\",\"id\":0,\"result\":{}}\n\n",
            "text/event-stream",
        ))
        .mount(&server)
        .await;

    let transport = McpTransport::connect(&http_config(&server.uri()))
        .await
        .expect("connect");
    let err = transport
        .request("tools/list", None, Some(Duration::from_secs(5)))
        .await
        .expect_err("stream never answered");
    assert_eq!(err.kind, bifrost_error::ErrorKind::Transport);
    assert!(err.error.message.contains("ended before answering"));
}

#[tokio::test]
async fn test_http_error_status_maps_to_provider_api() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream broke"))
        .mount(&server)
        .await;

    let transport = McpTransport::connect(&http_config(&server.uri()))
        .await
        .expect("connect");
    let err = transport
        .request("tools/list", None, Some(Duration::from_secs(5)))
        .await
        .expect_err("bad status");
    assert_eq!(err.kind, bifrost_error::ErrorKind::ProviderApi);
    assert_eq!(err.status_code, Some(500));
}

#[tokio::test]
async fn test_http_notify_accepts_202() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    let transport = McpTransport::connect(&http_config(&server.uri()))
        .await
        .expect("connect");
    transport
        .notify("notifications/initialized", None)
        .await
        .expect("accepted");
}

#[tokio::test]
async fn test_jsonrpc_error_surfaces_with_method_context() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(JsonRpcFailure)
        .mount(&server)
        .await;

    let transport = McpTransport::connect(&http_config(&server.uri()))
        .await
        .expect("connect");
    let err = transport
        .request("tools/call", None, Some(Duration::from_secs(5)))
        .await
        .expect_err("jsonrpc error");
    assert_eq!(err.kind, bifrost_error::ErrorKind::ProviderApi);
    assert!(err.error.message.contains("tools/call"));
    assert!(err.error.message.contains("method not found"));
}
