use super::*;

#[test]
fn test_file_upload_serde() {
    let input = FileUploadInput {
        filename: "batch.jsonl".to_string(),
        content: Bytes::from_static(b"{\"custom_id\":\"1\"}"),
        purpose: "batch".to_string(),
    };
    let json = serde_json::to_value(&input).expect("serialize");
    assert_eq!(json["filename"], "batch.jsonl");
    assert_eq!(json["purpose"], "batch");
    assert!(json["content"].is_string());
}

#[test]
fn test_batch_info_optional_fields() {
    let info = BatchInfo {
        id: "batch_1".to_string(),
        status: "in_progress".to_string(),
        input_file_id: Some("file_1".to_string()),
        output_file_id: None,
        error_file_id: None,
        created_at: None,
    };
    let json = serde_json::to_value(&info).expect("serialize");
    assert_eq!(json["status"], "in_progress");
    assert!(json.get("output_file_id").is_none());
}

#[test]
fn test_container_file_addressing() {
    let input = ContainerFileIdInput {
        container_id: "cntr_1".to_string(),
        file_id: "cfile_1".to_string(),
    };
    let json = serde_json::to_string(&input).expect("serialize");
    let parsed: ContainerFileIdInput = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(parsed.container_id, "cntr_1");
    assert_eq!(parsed.file_id, "cfile_1");
}
