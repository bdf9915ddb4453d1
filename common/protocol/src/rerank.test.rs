use super::*;

#[test]
fn test_input_constructor() {
    let input = RerankInput::new("rust worker pools", vec!["doc a".to_string()]);
    assert_eq!(input.query, "rust worker pools");
    assert_eq!(input.documents.len(), 1);
    assert!(input.top_n.is_none());
}

#[test]
fn test_result_serde() {
    let response = RerankResponse {
        results: vec![
            RerankResult {
                index: 2,
                relevance_score: 0.98,
            },
            RerankResult {
                index: 0,
                relevance_score: 0.12,
            },
        ],
    };
    let json = serde_json::to_value(&response).expect("serialize");
    assert_eq!(json["results"][0]["index"], 2);
}
