//! MCP connection transports.
//!
//! Every transport exposes the same request/notify surface over JSON-RPC.
//! Stdio and websocket connections multiplex responses back to callers
//! through a pending-request table keyed by request id; the HTTP transport
//! is request-scoped and needs no table.

use crate::jsonrpc::JsonRpcRequest;
use crate::jsonrpc::JsonRpcResponse;
use bifrost_error::BifrostError;
use bifrost_protocol::McpClientConfig;
use bifrost_protocol::McpConnectionType;
use eventsource_stream::Eventsource;
use futures::SinkExt;
use futures::StreamExt;
use serde_json::Value;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::net::TcpStream;
use tokio::process::Child;
use tokio::process::ChildStdin;
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::MaybeTlsStream;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tracing::debug;
use tracing::info;
use tracing::warn;

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>>;

/// Default cap on a single MCP round-trip when the caller set no deadline.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One live MCP connection.
#[derive(Debug)]
pub enum McpTransport {
    Stdio(StdioTransport),
    Http(HttpTransport),
    Websocket(WebsocketTransport),
}

impl McpTransport {
    /// Open the transport declared by the config.
    pub async fn connect(config: &McpClientConfig) -> Result<Self, BifrostError> {
        match config.connection_type {
            McpConnectionType::Stdio => Ok(Self::Stdio(StdioTransport::spawn(config).await?)),
            McpConnectionType::HttpSse => Ok(Self::Http(HttpTransport::new(config)?)),
            McpConnectionType::Websocket => {
                Ok(Self::Websocket(WebsocketTransport::connect(config).await?))
            }
        }
    }

    /// Issue a request and await its response.
    pub async fn request(
        &self,
        method: &str,
        params: Option<Value>,
        timeout: Option<Duration>,
    ) -> Result<Value, BifrostError> {
        let timeout = timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        let response = match self {
            Self::Stdio(t) => t.request(method, params, timeout).await?,
            Self::Http(t) => t.request(method, params, timeout).await?,
            Self::Websocket(t) => t.request(method, params, timeout).await?,
        };
        response
            .into_result()
            .map_err(|msg| BifrostError::provider_api(502, format!("{method}: {msg}")))
    }

    /// Send a notification; no response is expected.
    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), BifrostError> {
        let request = JsonRpcRequest::notification(method, params);
        match self {
            Self::Stdio(t) => t.send(&request).await,
            Self::Http(t) => t.notify(&request).await,
            Self::Websocket(t) => t.send(&request).await,
        }
    }

    /// Tear the connection down.
    pub async fn close(&self) {
        match self {
            Self::Stdio(t) => t.close().await,
            Self::Http(_) => {}
            Self::Websocket(t) => t.close().await,
        }
    }
}

async fn await_reply(
    rx: oneshot::Receiver<JsonRpcResponse>,
    pending: &PendingMap,
    id: u64,
    method: &str,
    timeout: Duration,
) -> Result<JsonRpcResponse, BifrostError> {
    match tokio::time::timeout(timeout, rx).await {
        Ok(Ok(response)) => Ok(response),
        Ok(Err(_)) => Err(BifrostError::transport(format!(
            "mcp connection closed awaiting {method}"
        ))),
        Err(_) => {
            pending.lock().await.remove(&id);
            Err(BifrostError::transport(format!(
                "timed out awaiting {method} after {timeout:?}"
            )))
        }
    }
}

fn route_response(pending: &PendingMap, line: &str) {
    let response: JsonRpcResponse = match serde_json::from_str(line) {
        Ok(response) => response,
        Err(err) => {
            debug!("ignoring unparseable mcp frame: {err}");
            return;
        }
    };
    let Some(id) = response.id else {
        // Server-initiated notification; nothing awaits it.
        return;
    };
    let pending = pending.clone();
    tokio::spawn(async move {
        if let Some(tx) = pending.lock().await.remove(&id) {
            let _ = tx.send(response);
        }
    });
}

/// Child process speaking newline-delimited JSON-RPC on stdio.
pub struct StdioTransport {
    child: Mutex<Child>,
    stdin: Mutex<ChildStdin>,
    pending: PendingMap,
    reader: JoinHandle<()>,
}

impl StdioTransport {
    async fn spawn(config: &McpClientConfig) -> Result<Self, BifrostError> {
        let mut command = Command::new(&config.connection_string);
        command
            .args(&config.args)
            .envs(&config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|err| {
            BifrostError::transport(format!(
                "failed to spawn mcp server {:?}: {err}",
                config.connection_string
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BifrostError::operation("mcp child stdin unavailable"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BifrostError::operation("mcp child stdout unavailable"))?;

        if let Some(stderr) = child.stderr.take() {
            let name = config.name.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    info!(client = %name, "mcp server stderr: {line}");
                }
            });
        }

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let reader_pending = pending.clone();
        let reader = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) if line.trim().is_empty() => {}
                    Ok(Some(line)) => route_response(&reader_pending, &line),
                    Ok(None) => break,
                    Err(err) => {
                        warn!("mcp stdout read failed: {err}");
                        break;
                    }
                }
            }
        });

        Ok(Self {
            child: Mutex::new(child),
            stdin: Mutex::new(stdin),
            pending,
            reader,
        })
    }

    async fn send(&self, request: &JsonRpcRequest) -> Result<(), BifrostError> {
        let mut line = serde_json::to_string(request)?;
        line.push('\n');
        let mut stdin = self.stdin.lock().await;
        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|err| BifrostError::transport(format!("mcp stdin write failed: {err}")))?;
        stdin
            .flush()
            .await
            .map_err(|err| BifrostError::transport(format!("mcp stdin flush failed: {err}")))
    }

    async fn request(
        &self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<JsonRpcResponse, BifrostError> {
        let request = JsonRpcRequest::new(method, params);
        let id = request.id.unwrap_or_default();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        if let Err(err) = self.send(&request).await {
            self.pending.lock().await.remove(&id);
            return Err(err);
        }
        await_reply(rx, &self.pending, id, method, timeout).await
    }

    async fn close(&self) {
        self.reader.abort();
        if let Err(err) = self.child.lock().await.start_kill() {
            debug!("mcp child already exited: {err}");
        }
    }
}

/// HTTP endpoint answering JSON-RPC with JSON or SSE bodies.
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    fn new(config: &McpClientConfig) -> Result<Self, BifrostError> {
        let mut headers = reqwest::header::HeaderMap::new();
        for (name, value) in &config.headers {
            let header_name = match reqwest::header::HeaderName::from_bytes(name.as_bytes()) {
                Ok(name) => name,
                Err(err) => {
                    warn!("invalid mcp header name {name:?}: {err}");
                    continue;
                }
            };
            let header_value = match reqwest::header::HeaderValue::from_str(value) {
                Ok(value) => value,
                Err(err) => {
                    warn!("invalid mcp header value for {name:?}: {err}");
                    continue;
                }
            };
            headers.insert(header_name, header_value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|err| BifrostError::operation(format!("mcp http client: {err}")))?;

        Ok(Self {
            client,
            url: config.connection_string.clone(),
        })
    }

    async fn post(
        &self,
        request: &JsonRpcRequest,
        timeout: Duration,
    ) -> Result<reqwest::Response, BifrostError> {
        let response = self
            .client
            .post(&self.url)
            .timeout(timeout)
            .header(
                reqwest::header::ACCEPT,
                "application/json, text/event-stream",
            )
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() && status != reqwest::StatusCode::ACCEPTED {
            let body = response.text().await.unwrap_or_default();
            return Err(BifrostError::provider_api(status.as_u16(), body));
        }
        Ok(response)
    }

    async fn request(
        &self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<JsonRpcResponse, BifrostError> {
        let request = JsonRpcRequest::new(method, params);
        let id = request.id.unwrap_or_default();
        let response = self.post(&request, timeout).await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if content_type.starts_with("text/event-stream") {
            // Streamable-HTTP servers answer over a one-shot SSE body; the
            // reply carries the request id we posted.
            let mut events = response.bytes_stream().eventsource();
            while let Some(event) = events.next().await {
                let event = event
                    .map_err(|err| BifrostError::transport(format!("mcp sse read: {err}")))?;
                match serde_json::from_str::<JsonRpcResponse>(&event.data) {
                    Ok(parsed) if parsed.id == Some(id) => return Ok(parsed),
                    Ok(_) => {}
                    Err(err) => debug!("ignoring unparseable mcp sse event: {err}"),
                }
            }
            Err(BifrostError::transport(format!(
                "mcp sse stream ended before answering {method}"
            )))
        } else {
            let body = response.bytes().await?;
            serde_json::from_slice(&body).map_err(|err| {
                BifrostError::decode(format!("mcp response for {method}: {err}"))
            })
        }
    }

    async fn notify(&self, request: &JsonRpcRequest) -> Result<(), BifrostError> {
        self.post(request, DEFAULT_REQUEST_TIMEOUT).await.map(|_| ())
    }
}

/// Websocket carrying one JSON-RPC frame per message.
pub struct WebsocketTransport {
    sink: Mutex<
        futures::stream::SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, WsMessage>,
    >,
    pending: PendingMap,
    reader: JoinHandle<()>,
}

impl WebsocketTransport {
    async fn connect(config: &McpClientConfig) -> Result<Self, BifrostError> {
        let mut request = config
            .connection_string
            .clone()
            .into_client_request()
            .map_err(|err| BifrostError::validation(format!("mcp websocket url: {err}")))?;
        for (name, value) in &config.headers {
            let header_name = match http::HeaderName::from_bytes(name.as_bytes()) {
                Ok(name) => name,
                Err(err) => {
                    warn!("invalid mcp header name {name:?}: {err}");
                    continue;
                }
            };
            let header_value = match http::HeaderValue::from_str(value) {
                Ok(value) => value,
                Err(err) => {
                    warn!("invalid mcp header value for {name:?}: {err}");
                    continue;
                }
            };
            request.headers_mut().insert(header_name, header_value);
        }

        let (stream, _) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|err| BifrostError::transport(format!("mcp websocket connect: {err}")))?;
        let (sink, mut source) = stream.split();

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let reader_pending = pending.clone();
        let reader = tokio::spawn(async move {
            while let Some(message) = source.next().await {
                match message {
                    Ok(WsMessage::Text(text)) => route_response(&reader_pending, &text),
                    Ok(WsMessage::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        warn!("mcp websocket read failed: {err}");
                        break;
                    }
                }
            }
        });

        Ok(Self {
            sink: Mutex::new(sink),
            pending,
            reader,
        })
    }

    async fn send(&self, request: &JsonRpcRequest) -> Result<(), BifrostError> {
        let text = serde_json::to_string(request)?;
        self.sink
            .lock()
            .await
            .send(WsMessage::Text(text))
            .await
            .map_err(|err| BifrostError::transport(format!("mcp websocket send: {err}")))
    }

    async fn request(
        &self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<JsonRpcResponse, BifrostError> {
        let request = JsonRpcRequest::new(method, params);
        let id = request.id.unwrap_or_default();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        if let Err(err) = self.send(&request).await {
            self.pending.lock().await.remove(&id);
            return Err(err);
        }
        await_reply(rx, &self.pending, id, method, timeout).await
    }

    async fn close(&self) {
        let _ = self.sink.lock().await.send(WsMessage::Close(None)).await;
        self.reader.abort();
    }
}

#[cfg(test)]
#[path = "transport.test.rs"]
mod tests;
