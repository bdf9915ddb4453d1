use super::*;

#[test]
fn test_input_constructors_set_one_source() {
    let text = VideoGenerationInput::text("a drone shot of cliffs");
    assert!(text.prompt_text.is_some());
    assert!(text.prompt_image.is_none());
    assert!(text.input_video.is_none());

    let image = VideoGenerationInput::image("https://example.com/ref.png");
    assert!(image.prompt_image.is_some());

    let video = VideoGenerationInput::video("https://example.com/src.mp4");
    assert!(video.input_video.is_some());
}

#[test]
fn test_status_serde() {
    let json = serde_json::to_string(&VideoJobStatus::Succeeded).expect("serialize");
    assert_eq!(json, "\"succeeded\"");
}

#[test]
fn test_job_serde_skips_unset() {
    let job = VideoJob {
        id: "job_1".to_string(),
        status: VideoJobStatus::Running,
        progress: Some(0.4),
        output_url: None,
        failure_reason: None,
    };
    let json = serde_json::to_value(&job).expect("serialize");
    assert_eq!(json["status"], "running");
    assert!(json.get("output_url").is_none());
}
