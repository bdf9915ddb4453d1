use super::*;

#[test]
fn test_speech_input_constructor() {
    let input = SpeechInput::new("read this aloud", "alloy");
    assert_eq!(input.input, "read this aloud");
    assert_eq!(input.voice, "alloy");
    assert!(input.response_format.is_none());
}

#[test]
fn test_binary_fields_roundtrip_base64() {
    let response = SpeechResponse {
        audio: Bytes::from_static(b"\x00\x01\x02audio"),
        content_type: Some("audio/mpeg".to_string()),
    };
    let json = serde_json::to_string(&response).expect("serialize");
    let parsed: SpeechResponse = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(parsed.audio, response.audio);
}

#[test]
fn test_transcription_input_serde() {
    let input = TranscriptionInput {
        file: Bytes::from_static(b"RIFFdata"),
        filename: "sample.wav".to_string(),
        language: Some("en".to_string()),
        prompt: None,
        response_format: None,
    };
    let json = serde_json::to_value(&input).expect("serialize");
    assert_eq!(json["filename"], "sample.wav");
    // Binary content is carried as base64 text.
    assert!(json["file"].is_string());
}
