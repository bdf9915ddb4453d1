use super::*;
use serde::Deserialize;

#[test]
fn test_tool_definition_builder() {
    let tool = ToolDefinition::new("get_weather", serde_json::json!({"type": "object"}))
        .with_description("Look up the weather");
    assert_eq!(tool.name, "get_weather");
    assert_eq!(tool.description.as_deref(), Some("Look up the weather"));
}

#[test]
fn test_tool_choice_serde() {
    let json = serde_json::to_value(ToolChoice::Auto).expect("serialize");
    assert_eq!(json["type"], "auto");

    let json = serde_json::to_value(ToolChoice::Tool {
        name: "get_weather".to_string(),
    })
    .expect("serialize");
    assert_eq!(json["type"], "tool");
    assert_eq!(json["name"], "get_weather");
}

#[test]
fn test_parse_arguments() {
    #[derive(Deserialize)]
    struct Args {
        city: String,
    }

    let call = ToolCall::new("call_1", "get_weather", serde_json::json!({"city": "Oslo"}));
    let args: Args = call.parse_arguments().expect("parse");
    assert_eq!(args.city, "Oslo");
}

#[test]
fn test_tool_result_content_to_text() {
    assert_eq!(ToolResultContent::text("done").to_text(), "done");
    assert_eq!(
        ToolResultContent::json(serde_json::json!({"ok": true})).to_text(),
        "{\"ok\":true}"
    );
}
