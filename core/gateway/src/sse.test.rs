use super::*;
use bifrost_protocol::Provider;
use bifrost_protocol::RequestKind;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::method;

fn metadata() -> ResponseMetadata {
    ResponseMetadata::new(Provider::Openai, "gpt-4o-mini", RequestKind::ChatCompletion)
}

async fn sse_response(server: &MockServer, body: &'static str) -> reqwest::Response {
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(server)
        .await;
    reqwest::get(server.uri()).await.expect("request")
}

/// Parser treating every event as a text delta; `stop` is terminal.
fn delta_parser(
    data: &str,
    _accumulator: &mut StreamAccumulator,
) -> Result<ParsedEvent, BifrostError> {
    if data == "stop" {
        return Ok(ParsedEvent {
            chunks: Vec::new(),
            terminal: true,
        });
    }
    Ok(ParsedEvent::chunks(vec![StreamChunk::Delta {
        text: data.to_string(),
    }]))
}

#[test]
fn test_accumulator_builds_chat_response() {
    let mut accumulator = StreamAccumulator::default();
    accumulator.apply(&StreamChunk::Delta {
        text: "Hello ".to_string(),
    });
    accumulator.apply(&StreamChunk::Delta {
        text: "world".to_string(),
    });
    accumulator.apply(&StreamChunk::ToolCallDelta {
        index: 0,
        id: Some("call_1".to_string()),
        name: Some("lookup".to_string()),
        arguments: Some("{\"q\":1}".to_string()),
    });

    let response = accumulator.into_chat_response("fallback-model");
    assert_eq!(response.text(), "Hello world");
    assert_eq!(response.model, "fallback-model");
    assert_eq!(response.tool_calls().len(), 1);
}

#[test]
fn test_accumulator_ignores_incomplete_tool_slots() {
    let mut accumulator = StreamAccumulator::default();
    // Index 1 arrives without index 0 ever being started.
    accumulator.apply(&StreamChunk::ToolCallDelta {
        index: 1,
        id: Some("call_b".to_string()),
        name: Some("second".to_string()),
        arguments: None,
    });
    let response = accumulator.into_chat_response("m");
    assert_eq!(response.tool_calls().len(), 1);
}

#[tokio::test]
async fn test_stream_delivers_chunks_then_terminal() {
    let server = MockServer::start().await;
    let response = sse_response(
        &server,
        "data: one\n\ndata: two\n\ndata: stop\n\n",
    )
    .await;

    let mut rx = spawn_sse_stream(
        response,
        RequestContext::new(),
        metadata(),
        Instant::now(),
        delta_parser,
    );

    let mut chunks = Vec::new();
    while let Some(chunk) = rx.recv().await {
        chunks.push(chunk);
    }

    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0].as_delta(), Some("one"));
    assert_eq!(chunks[1].as_delta(), Some("two"));
    assert!(chunks[2].is_terminal());
    match &chunks[2] {
        StreamChunk::Done { response } => {
            assert_eq!(response.as_chat().expect("chat").text(), "onetwo");
        }
        other => panic!("expected Done, got {other:?}"),
    }
}

#[tokio::test]
async fn test_done_marker_terminates_stream() {
    let server = MockServer::start().await;
    let response = sse_response(&server, "data: one\n\ndata: [DONE]\n\n").await;

    let mut rx = spawn_sse_stream(
        response,
        RequestContext::new(),
        metadata(),
        Instant::now(),
        delta_parser,
    );

    let mut terminal_count = 0;
    let mut total = 0;
    while let Some(chunk) = rx.recv().await {
        total += 1;
        if chunk.is_terminal() {
            terminal_count += 1;
        }
    }
    assert_eq!(total, 2);
    assert_eq!(terminal_count, 1, "exactly one terminal chunk");
}

#[tokio::test]
async fn test_stream_end_without_terminal_synthesizes_done() {
    let server = MockServer::start().await;
    let response = sse_response(&server, "data: only\n\n").await;

    let mut rx = spawn_sse_stream(
        response,
        RequestContext::new(),
        metadata(),
        Instant::now(),
        delta_parser,
    );

    let mut last = None;
    while let Some(chunk) = rx.recv().await {
        last = Some(chunk);
    }
    assert!(last.expect("chunks").is_terminal());
}

#[tokio::test]
async fn test_parser_error_terminates_with_error_chunk() {
    let server = MockServer::start().await;
    let response = sse_response(&server, "data: boom\n\ndata: more\n\n").await;

    let mut rx = spawn_sse_stream(
        response,
        RequestContext::new(),
        metadata(),
        Instant::now(),
        |data, _| {
            if data == "boom" {
                Err(BifrostError::decode("bad event"))
            } else {
                Ok(ParsedEvent::empty())
            }
        },
    );

    let chunk = rx.recv().await.expect("error chunk");
    match chunk {
        StreamChunk::Error { error } => {
            assert_eq!(error.kind, bifrost_error::ErrorKind::Decode);
        }
        other => panic!("expected Error, got {other:?}"),
    }
    assert!(rx.recv().await.is_none(), "channel closes after terminal");
}

#[tokio::test]
async fn test_cancellation_terminates_with_canceled() {
    let server = MockServer::start().await;
    // No terminal marker; the stream would wait for more events.
    let response = sse_response(&server, "data: first\n\n").await;

    let ctx = RequestContext::new();
    // Cancelled before the read loop starts; the first suspension point
    // observes it.
    ctx.cancel();
    let mut rx = spawn_sse_stream(
        response,
        ctx.clone(),
        metadata(),
        Instant::now(),
        |_, _| Ok(ParsedEvent::empty()),
    );

    let chunk = rx.recv().await.expect("terminal chunk");
    match chunk {
        StreamChunk::Error { error } => {
            assert_eq!(error.kind, bifrost_error::ErrorKind::Canceled);
        }
        other => panic!("expected canceled terminal, got {other:?}"),
    }
    assert!(rx.recv().await.is_none());
}
