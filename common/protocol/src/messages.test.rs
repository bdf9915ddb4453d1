use super::*;

#[test]
fn test_message_constructors() {
    let msg = Message::user("hello");
    assert_eq!(msg.role, Role::User);
    assert_eq!(msg.text(), "hello");

    let msg = Message::system("be brief");
    assert_eq!(msg.role, Role::System);

    let msg = Message::assistant("hi there");
    assert_eq!(msg.role, Role::Assistant);
}

#[test]
fn test_text_concatenates_blocks() {
    let msg = Message::new(
        Role::Assistant,
        vec![
            ContentBlock::text("part one "),
            ContentBlock::tool_use("call_1", "lookup", serde_json::json!({})),
            ContentBlock::text("part two"),
        ],
    );
    assert_eq!(msg.text(), "part one part two");
}

#[test]
fn test_content_block_predicates() {
    let tool = ContentBlock::tool_use("call_1", "lookup", serde_json::json!({"q": "x"}));
    assert!(tool.is_tool_use());
    assert!(!tool.is_thinking());
    assert_eq!(tool.as_text(), None);

    let thinking = ContentBlock::Thinking {
        content: "hmm".to_string(),
        signature: None,
    };
    assert!(thinking.is_thinking());
}

#[test]
fn test_content_block_serde_tags() {
    let block = ContentBlock::text("hi");
    let json = serde_json::to_value(&block).expect("serialize");
    assert_eq!(json["type"], "text");

    let block = ContentBlock::image_url("https://example.com/cat.png");
    let json = serde_json::to_value(&block).expect("serialize");
    assert_eq!(json["type"], "image");
    assert_eq!(json["source"]["type"], "url");
}
