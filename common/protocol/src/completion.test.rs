use super::*;
use crate::messages::ContentBlock;

#[test]
fn test_chat_response_text() {
    let response = ChatResponse::new("resp_1", "gpt-4o-mini").with_content(vec![
        ContentBlock::text("Hello"),
        ContentBlock::text(", world"),
    ]);
    assert_eq!(response.text(), "Hello, world");
}

#[test]
fn test_tool_calls_extraction() {
    let response = ChatResponse::new("resp_1", "gpt-4o-mini").with_content(vec![
        ContentBlock::text("Let me check."),
        ContentBlock::tool_use("call_1", "get_weather", serde_json::json!({"city": "Oslo"})),
    ]);

    assert!(response.has_tool_calls());
    let calls = response.tool_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].name, "get_weather");
    assert_eq!(calls[0].arguments["city"], "Oslo");
}

#[test]
fn test_token_usage_totals() {
    let usage = TokenUsage::new(100, 25);
    assert_eq!(usage.total_tokens, 125);
}

#[test]
fn test_finish_reason_serde() {
    let json = serde_json::to_string(&FinishReason::ToolCalls).expect("serialize");
    assert_eq!(json, "\"tool_calls\"");
    assert_eq!(FinishReason::default(), FinishReason::Stop);
}
