use super::*;

#[test]
fn test_single_and_batch_constructors() {
    let single = EmbeddingInput::single("hello");
    assert_eq!(single.texts, vec!["hello".to_string()]);

    let batch = EmbeddingInput::batch(vec!["a".to_string(), "b".to_string()]);
    assert_eq!(batch.texts.len(), 2);
}

#[test]
fn test_encoding_format_default() {
    assert_eq!(EncodingFormat::default(), EncodingFormat::Float);
    let json = serde_json::to_string(&EncodingFormat::Base64).expect("serialize");
    assert_eq!(json, "\"base64\"");
}

#[test]
fn test_response_preserves_order() {
    let response = EmbeddingResponse {
        embeddings: vec![
            Embedding {
                index: 0,
                embedding: vec![0.1, 0.2],
            },
            Embedding {
                index: 1,
                embedding: vec![0.3, 0.4],
            },
        ],
        model: "text-embedding-3-small".to_string(),
        usage: None,
    };
    assert_eq!(response.embeddings[0].index, 0);
    assert_eq!(response.embeddings[1].index, 1);
}
