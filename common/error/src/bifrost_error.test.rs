use super::*;

#[test]
fn test_error_display() {
    let err = BifrostError::unsupported("runway", "chat_completion");
    assert_eq!(
        err.to_string(),
        "unsupported_operation: provider runway does not support chat_completion"
    );

    let err = BifrostError::no_eligible_key("openai", "gpt-4o-mini");
    assert_eq!(
        err.to_string(),
        "no_eligible_key: no eligible key for model gpt-4o-mini on provider openai"
    );
}

#[test]
fn test_internal_flag() {
    assert!(BifrostError::validation("bad request").is_bifrost_error);
    assert!(BifrostError::operation("worker panicked").is_bifrost_error);
    assert!(!BifrostError::transport("connection reset").is_bifrost_error);
    assert!(!BifrostError::provider_api(429, "rate limited").is_bifrost_error);
    assert!(!BifrostError::decode("unexpected token").is_bifrost_error);
}

#[test]
fn test_provider_api_trims_trailing_newlines() {
    let err = BifrostError::provider_api(500, "internal error\n\n");
    assert_eq!(err.error.message, "internal error");
    assert_eq!(err.status_code, Some(500));
}

#[test]
fn test_boundary_status_code() {
    assert_eq!(
        BifrostError::provider_api(429, "slow down").boundary_status_code(),
        429
    );
    // Upstream failure with no parsed status surfaces as 400.
    assert_eq!(
        BifrostError::transport("timeout").boundary_status_code(),
        400
    );
    // Internal failure surfaces as 500.
    assert_eq!(
        BifrostError::operation("precondition").boundary_status_code(),
        500
    );
}

#[test]
fn test_policy_accessors() {
    assert!(BifrostError::transport("reset").is_retryable());
    assert!(!BifrostError::provider_api(500, "boom").is_retryable());

    assert!(BifrostError::queue_full("openai").skips_hop());
    assert!(!BifrostError::validation("bad").skips_hop());

    assert!(BifrostError::canceled().is_terminal());
    assert!(BifrostError::deadline_exceeded().is_terminal());
    assert!(!BifrostError::transport("reset").is_terminal());
}

#[test]
fn test_builder_fields() {
    let err = BifrostError::provider_api(401, "bad key")
        .with_type("authentication_error")
        .with_code("invalid_api_key")
        .with_provider("anthropic")
        .with_model("claude-sonnet-4")
        .with_request_kind("chat_completion")
        .with_fallback_index(1);

    assert_eq!(err.error.error_type.as_deref(), Some("authentication_error"));
    assert_eq!(err.error.code.as_deref(), Some("invalid_api_key"));
    assert_eq!(err.extra_fields.provider.as_deref(), Some("anthropic"));
    assert_eq!(err.extra_fields.model.as_deref(), Some("claude-sonnet-4"));
    assert_eq!(
        err.extra_fields.request_kind.as_deref(),
        Some("chat_completion")
    );
    assert_eq!(err.extra_fields.fallback_index, Some(1));
}

#[test]
fn test_serde_wire_shape() {
    let err = BifrostError::provider_api(429, "rate limited").with_provider("openai");
    let json = serde_json::to_value(&err).expect("serialize");

    assert_eq!(json["isBifrostError"], serde_json::json!(false));
    assert_eq!(json["statusCode"], serde_json::json!(429));
    assert_eq!(json["error"]["message"], serde_json::json!("rate limited"));
    assert_eq!(json["extraFields"]["provider"], serde_json::json!("openai"));
}

#[test]
fn test_parse_retry_after() {
    assert_eq!(
        parse_retry_after("try again in 5s"),
        Some(Duration::from_secs(5))
    );
    assert_eq!(
        parse_retry_after("try again in 500ms"),
        Some(Duration::from_millis(500))
    );
    assert_eq!(
        parse_retry_after("Please try again in 2.5 seconds"),
        Some(Duration::from_secs_f64(2.5))
    );
    assert_eq!(parse_retry_after("some other error"), None);
}

#[test]
fn test_retry_after_builder() {
    let err = BifrostError::transport("overloaded, try again in 2s")
        .with_retry_after(Duration::from_secs(2));
    assert_eq!(err.retry_after, Some(Duration::from_secs(2)));
}
