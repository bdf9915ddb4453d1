use super::*;

#[test]
fn test_builder_methods() {
    let params = ModelParameters::default()
        .temperature(0.7)
        .max_tokens(1000)
        .top_p(0.9);
    assert_eq!(params.temperature, Some(0.7));
    assert_eq!(params.max_tokens, Some(1000));
    assert_eq!(params.top_p, Some(0.9));
}

#[test]
fn test_has_tools() {
    let params = ModelParameters::default();
    assert!(!params.has_tools());

    let params = params.tools(vec![]);
    assert!(!params.has_tools());

    let params = ModelParameters::default().tools(vec![ToolDefinition::new(
        "lookup",
        serde_json::json!({"type": "object"}),
    )]);
    assert!(params.has_tools());
}

#[test]
fn test_extra_params_survive_serde() {
    let params = ModelParameters::default()
        .extra_param("logit_bias", serde_json::json!({"50256": -100}));
    let json = serde_json::to_string(&params).expect("serialize");
    let parsed: ModelParameters = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(
        parsed.extra.get("logit_bias"),
        Some(&serde_json::json!({"50256": -100}))
    );
}

#[test]
fn test_unset_fields_skipped_in_serialization() {
    let json = serde_json::to_string(&ModelParameters::default()).expect("serialize");
    assert_eq!(json, "{}");
}
