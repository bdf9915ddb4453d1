use super::*;
use chrono::TimeZone;

#[test]
fn test_canonical_query_sorts_by_name_then_value() {
    assert_eq!(canonical_query("a=1&b=%20&a=2"), "a=1&a=2&b=%20");
}

#[test]
fn test_canonical_query_is_idempotent() {
    let cases = [
        "a=1&b=%20&a=2",
        "key=va%2Blue&other=sp%20ace",
        "x=~tilde&y=dot.dash-under_score",
        "",
    ];
    for case in cases {
        let once = canonical_query(case);
        assert_eq!(canonical_query(&once), once, "not idempotent for {case:?}");
    }
}

#[test]
fn test_canonical_query_plus_is_literal() {
    // `+` decodes to a literal plus, which re-encodes as %2B, never a space.
    assert_eq!(canonical_query("a=1+2"), "a=1%2B2");
    assert_eq!(canonical_query("a=%2B"), "a=%2B");
}

#[test]
fn test_canonical_query_uses_uppercase_hex() {
    assert_eq!(canonical_query("a=%2f"), "a=%2F");
    assert_eq!(canonical_query("a= "), "a=%20");
}

#[test]
fn test_canonical_query_unreserved_set_stays_bare() {
    assert_eq!(
        canonical_query("k=AZaz09-_.~"),
        "k=AZaz09-_.~",
        "unreserved characters must not encode"
    );
}

#[test]
fn test_canonical_headers() {
    let headers = vec![
        ("Content-Type".to_string(), "application/json".to_string()),
        ("Host".to_string(), " bedrock.us-east-1.amazonaws.com ".to_string()),
        ("X-Custom".to_string(), "a   b    c".to_string()),
        ("Authorization".to_string(), "secret".to_string()),
        ("User-Agent".to_string(), "test".to_string()),
    ];
    let (block, signed) = canonical_headers(&headers, true);
    assert_eq!(
        block,
        "content-type:application/json\nhost:bedrock.us-east-1.amazonaws.com\nx-custom:a b c\n"
    );
    assert_eq!(signed, "content-type;host;x-custom");
}

#[test]
fn test_canonical_headers_group_values_per_name() {
    let headers = vec![
        ("X-Multi".to_string(), "one".to_string()),
        ("x-multi".to_string(), "two".to_string()),
    ];
    let (block, signed) = canonical_headers(&headers, false);
    assert_eq!(block, "x-multi:one,two\n");
    assert_eq!(signed, "x-multi");
}

#[test]
fn test_content_length_excluded_without_body() {
    let headers = vec![
        ("Host".to_string(), "example.com".to_string()),
        ("Content-Length".to_string(), "42".to_string()),
    ];
    let (with_body, _) = canonical_headers(&headers, true);
    assert!(with_body.contains("content-length:42"));

    let (without_body, _) = canonical_headers(&headers, false);
    assert!(!without_body.contains("content-length"));
}

#[test]
fn test_canonical_request_spec_vector() {
    // GET /model/anthropic.claude-3/invoke?a=1&b=%20&a=2 with empty body.
    let headers = vec![("Host".to_string(), "bedrock.us-east-1.amazonaws.com".to_string())];
    let canonical = canonical_request(
        "GET",
        "/model/anthropic.claude-3/invoke",
        "a=1&b=%20&a=2",
        &headers,
        b"",
    );

    let lines: Vec<&str> = canonical.split('\n').collect();
    assert_eq!(lines[0], "GET");
    assert_eq!(lines[1], "/model/anthropic.claude-3/invoke");
    assert_eq!(lines[2], "a=1&a=2&b=%20");
    // sha256 of the empty string.
    assert_eq!(
        lines[lines.len() - 1],
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
}

#[test]
fn test_canonical_request_is_byte_stable() {
    let headers = vec![("Host".to_string(), "example.com".to_string())];
    let first = canonical_request("POST", "/model/m/invoke", "b=2&a=1", &headers, b"{}");
    for _ in 0..10 {
        let again = canonical_request("POST", "/model/m/invoke", "b=2&a=1", &headers, b"{}");
        assert_eq!(first, again);
    }
}

#[test]
fn test_signing_key_derivation_matches_aws_reference() {
    // Known vector from the AWS signature documentation.
    let key = derive_signing_key(
        "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
        "20120215",
        "us-east-1",
        "iam",
    );
    assert_eq!(
        hex::encode(key),
        "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
    );
}

#[test]
fn test_signing_key_cache_double_check_and_reuse() {
    let cache = SigningKeyCache::new();
    let first = cache.signing_key("secret", "AKIA1", "20260801", "us-east-1", "bedrock");
    let second = cache.signing_key("secret", "AKIA1", "20260801", "us-east-1", "bedrock");
    assert_eq!(first, second);
    assert_eq!(cache.len(), 1);

    // Different scope derives a different key.
    let other = cache.signing_key("secret", "AKIA1", "20260801", "eu-west-1", "bedrock");
    assert_ne!(first, other);
    assert_eq!(cache.len(), 2);
}

#[test]
fn test_signing_key_cache_sweeps_stale_dates() {
    let cache = SigningKeyCache::new();
    cache.signing_key("secret", "AKIA1", "20260728", "us-east-1", "bedrock");
    assert_eq!(cache.len(), 1);

    // Inserting under a date more than two days later evicts the old entry.
    cache.signing_key("secret", "AKIA1", "20260801", "us-east-1", "bedrock");
    assert_eq!(cache.len(), 1);

    // Entries within the two-day window survive.
    cache.signing_key("secret", "AKIA1", "20260802", "us-east-1", "bedrock");
    assert_eq!(cache.len(), 2);
}

#[test]
fn test_sign_request_shape() {
    let cache = SigningKeyCache::new();
    let now = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).single().expect("valid time");
    let headers = vec![("host".to_string(), "bedrock.us-east-1.amazonaws.com".to_string())];

    let signed = sign_request(
        &cache,
        &SigningParams {
            access_key: "AKIAEXAMPLE",
            secret_key: "secret",
            session_token: None,
            region: "us-east-1",
            service: "bedrock",
        },
        "POST",
        "/model/anthropic.claude-3/invoke",
        "",
        &headers,
        b"{}",
        now,
    )
    .expect("sign");

    let authorization = signed
        .iter()
        .find(|(name, _)| name == "authorization")
        .map(|(_, value)| value.as_str())
        .expect("authorization header");
    assert!(authorization.starts_with(
        "AWS4-HMAC-SHA256 Credential=AKIAEXAMPLE/20260801/us-east-1/bedrock/aws4_request"
    ));
    assert!(authorization.contains("SignedHeaders=host;x-amz-date"));
    assert!(authorization.contains("Signature="));

    let amz_date = signed
        .iter()
        .find(|(name, _)| name == "x-amz-date")
        .map(|(_, value)| value.as_str())
        .expect("date header");
    assert_eq!(amz_date, "20260801T120000Z");
}

#[test]
fn test_sign_request_is_deterministic() {
    let now = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).single().expect("valid time");
    let headers = vec![("host".to_string(), "example.com".to_string())];
    let params = SigningParams {
        access_key: "AKIAEXAMPLE",
        secret_key: "secret",
        session_token: None,
        region: "us-east-1",
        service: "bedrock",
    };

    let first = sign_request(
        &SigningKeyCache::new(),
        &params,
        "POST",
        "/p",
        "a=1",
        &headers,
        b"body",
        now,
    )
    .expect("sign");
    let second = sign_request(
        &SigningKeyCache::new(),
        &params,
        "POST",
        "/p",
        "a=1",
        &headers,
        b"body",
        now,
    )
    .expect("sign");
    assert_eq!(first, second);
}

#[test]
fn test_empty_credentials_rejected() {
    let now = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).single().expect("valid time");
    let result = sign_request(
        &SigningKeyCache::new(),
        &SigningParams {
            access_key: "",
            secret_key: "",
            session_token: None,
            region: "us-east-1",
            service: "bedrock",
        },
        "GET",
        "/",
        "",
        &[],
        b"",
        now,
    );
    assert!(result.is_err());
}
