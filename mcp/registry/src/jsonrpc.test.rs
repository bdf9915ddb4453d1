use super::*;

#[test]
fn test_request_ids_are_unique() {
    let a = JsonRpcRequest::new("tools/list", None);
    let b = JsonRpcRequest::new("tools/list", None);
    assert_ne!(a.id, b.id);
}

#[test]
fn test_notification_has_no_id() {
    let note = JsonRpcRequest::notification("notifications/initialized", None);
    assert!(note.id.is_none());

    let json = serde_json::to_value(&note).expect("serialize");
    assert_eq!(json["jsonrpc"], "2.0");
    assert!(json.get("id").is_none());
}

#[test]
fn test_response_into_result() {
    let ok: JsonRpcResponse =
        serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":{"tools":[]}}"#)
            .expect("deserialize");
    assert_eq!(
        ok.into_result().expect("result"),
        serde_json::json!({"tools": []})
    );

    let err: JsonRpcResponse = serde_json::from_str(
        r#"{"jsonrpc":"2.0","id":2,"error":{"code":-32601,"message":"method not found"}}"#,
    )
    .expect("deserialize");
    let message = err.into_result().expect_err("error");
    assert!(message.contains("method not found"));
    assert!(message.contains("-32601"));
}

#[test]
fn test_missing_result_is_null() {
    let response: JsonRpcResponse =
        serde_json::from_str(r#"{"jsonrpc":"2.0","id":3}"#).expect("deserialize");
    assert_eq!(response.into_result().expect("result"), Value::Null);
}
