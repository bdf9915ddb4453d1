use super::*;

#[test]
fn test_generation_input_constructor() {
    let input = ImageGenerationInput::new("a lighthouse at dusk");
    assert_eq!(input.prompt, "a lighthouse at dusk");
    assert!(input.n.is_none());
}

#[test]
fn test_image_response_serde() {
    let response = ImageResponse {
        created: Some(1_700_000_000),
        data: vec![ImageData {
            url: Some("https://example.com/img.png".to_string()),
            b64_json: None,
            revised_prompt: None,
        }],
    };
    let json = serde_json::to_value(&response).expect("serialize");
    assert_eq!(json["data"][0]["url"], "https://example.com/img.png");
    // Unset fields do not appear on the wire.
    assert!(json["data"][0].get("b64_json").is_none());
}
