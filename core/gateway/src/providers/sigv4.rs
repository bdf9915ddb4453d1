//! AWS Signature Version 4 request signing.
//!
//! Canonical request: `METHOD\nencodedPath\ncanonicalQuery\n
//! canonicalHeaders\nsignedHeaders\nhex(sha256(body))`. Derived signing
//! keys are cached by `(access_key, date, region, service)`; entries are
//! immutable within their date and swept once older than two days.

use bifrost_error::BifrostError;
use chrono::DateTime;
use chrono::Utc;
use hmac::Hmac;
use hmac::Mac;
use percent_encoding::AsciiSet;
use percent_encoding::NON_ALPHANUMERIC;
use percent_encoding::percent_decode_str;
use percent_encoding::percent_encode;
use sha2::Digest;
use sha2::Sha256;
use std::collections::HashMap;
use std::sync::RwLock;

type HmacSha256 = Hmac<Sha256>;

/// RFC 3986 unreserved set: everything except A-Z a-z 0-9 - _ . ~ encodes.
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Headers never included in the canonical request.
const EXCLUDED_HEADERS: &[&str] = &[
    "authorization",
    "user-agent",
    "x-amzn-trace-id",
    "expect",
    "transfer-encoding",
];

/// Credentials and scope for one signing operation.
pub struct SigningParams<'a> {
    pub access_key: &'a str,
    pub secret_key: &'a str,
    pub session_token: Option<&'a str>,
    pub region: &'a str,
    pub service: &'a str,
}

/// Hex-encoded SHA-256 of a payload.
pub fn payload_hash(body: &[u8]) -> String {
    hex::encode(Sha256::digest(body))
}

fn hmac(key: &[u8], data: &[u8]) -> Vec<u8> {
    // HMAC-SHA256 accepts keys of any length.
    #[allow(clippy::expect_used)]
    let mut mac = HmacSha256::new_from_slice(key).expect("hmac accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Canonicalize a query string.
///
/// Each pair is decoded and re-encoded against the RFC 3986 unreserved
/// set with uppercase hex; a literal `+` re-encodes as `%2B`, never as a
/// space. Pairs sort by (name, value). The transform is idempotent.
pub fn canonical_query(query: &str) -> String {
    if query.is_empty() {
        return String::new();
    }

    let mut pairs: Vec<(String, String)> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(name), decode_component(value))
        })
        .collect();
    pairs.sort();

    pairs
        .iter()
        .map(|(name, value)| {
            format!(
                "{}={}",
                percent_encode(name.as_bytes(), QUERY_ENCODE_SET),
                percent_encode(value.as_bytes(), QUERY_ENCODE_SET)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn decode_component(component: &str) -> String {
    // `+` is a literal plus on this wire, not an encoded space.
    percent_decode_str(component)
        .decode_utf8_lossy()
        .to_string()
}

/// Canonicalize headers: lowercased names, trimmed values with internal
/// runs of spaces collapsed, values grouped per name joined by commas,
/// sorted by name. Returns the canonical header block and the signed
/// header list.
pub fn canonical_headers(headers: &[(String, String)], has_body: bool) -> (String, String) {
    let mut grouped: HashMap<String, Vec<String>> = HashMap::new();
    for (name, value) in headers {
        let name = name.to_ascii_lowercase();
        if EXCLUDED_HEADERS.contains(&name.as_str()) {
            continue;
        }
        if name == "content-length" && !has_body {
            continue;
        }
        grouped.entry(name).or_default().push(collapse_spaces(value));
    }

    let mut names: Vec<&String> = grouped.keys().collect();
    names.sort();

    let block = names
        .iter()
        .map(|name| format!("{name}:{}\n", grouped[name.as_str()].join(",")))
        .collect::<String>();
    let signed = names
        .iter()
        .map(|name| name.as_str())
        .collect::<Vec<_>>()
        .join(";");
    (block, signed)
}

fn collapse_spaces(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Build the canonical request string.
pub fn canonical_request(
    method: &str,
    encoded_path: &str,
    query: &str,
    headers: &[(String, String)],
    body: &[u8],
) -> String {
    let (header_block, signed_headers) = canonical_headers(headers, !body.is_empty());
    format!(
        "{method}\n{encoded_path}\n{}\n{header_block}\n{signed_headers}\n{}",
        canonical_query(query),
        payload_hash(body)
    )
}

/// Cache of derived signing keys.
///
/// Readers take the shared lock; a miss re-checks under the write lock
/// before deriving, so concurrent misses derive once. Entries older than
/// two days are swept on insert.
#[derive(Default)]
pub struct SigningKeyCache {
    keys: RwLock<HashMap<String, Vec<u8>>>,
}

impl SigningKeyCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn cache_key(access_key: &str, date: &str, region: &str, service: &str) -> String {
        format!("{access_key}|{date}|{region}|{service}")
    }

    /// Derive (or fetch) the signing key for a scope.
    ///
    /// `date` is the eight-digit UTC date (YYYYMMDD).
    pub fn signing_key(
        &self,
        secret_key: &str,
        access_key: &str,
        date: &str,
        region: &str,
        service: &str,
    ) -> Vec<u8> {
        let cache_key = Self::cache_key(access_key, date, region, service);

        if let Some(key) = self
            .keys
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&cache_key)
        {
            return key.clone();
        }

        let mut keys = self.keys.write().unwrap_or_else(|e| e.into_inner());
        // Double-check: another writer may have derived it first.
        if let Some(key) = keys.get(&cache_key) {
            return key.clone();
        }

        let derived = derive_signing_key(secret_key, date, region, service);
        Self::sweep(&mut keys, date);
        keys.insert(cache_key, derived.clone());
        derived
    }

    /// Drop entries whose date component is more than two days behind.
    fn sweep(keys: &mut HashMap<String, Vec<u8>>, today: &str) {
        let Ok(today) = today.parse::<u32>() else {
            return;
        };
        keys.retain(|cache_key, _| {
            cache_key
                .split('|')
                .nth(1)
                .and_then(|date| date.parse::<u32>().ok())
                .is_none_or(|date| today.saturating_sub(date) <= 2)
        });
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.keys.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

fn derive_signing_key(secret_key: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac(format!("AWS4{secret_key}").as_bytes(), date.as_bytes());
    let k_region = hmac(&k_date, region.as_bytes());
    let k_service = hmac(&k_region, service.as_bytes());
    hmac(&k_service, b"aws4_request")
}

/// Sign a request, returning the headers to attach.
///
/// Produces `authorization`, `x-amz-date`, `x-amz-content-sha256`, and
/// `x-amz-security-token` when a session token is present. The supplied
/// headers must already include `host`.
pub fn sign_request(
    cache: &SigningKeyCache,
    params: &SigningParams<'_>,
    method: &str,
    encoded_path: &str,
    query: &str,
    headers: &[(String, String)],
    body: &[u8],
    now: DateTime<Utc>,
) -> Result<Vec<(String, String)>, BifrostError> {
    if params.access_key.is_empty() || params.secret_key.is_empty() {
        return Err(BifrostError::validation("aws credentials are empty"));
    }

    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date = now.format("%Y%m%d").to_string();

    let mut all_headers = headers.to_vec();
    all_headers.push(("x-amz-date".to_string(), amz_date.clone()));
    if let Some(token) = params.session_token {
        all_headers.push(("x-amz-security-token".to_string(), token.to_string()));
    }

    let canonical = canonical_request(method, encoded_path, query, &all_headers, body);
    let (_, signed_headers) = canonical_headers(&all_headers, !body.is_empty());

    let scope = format!("{date}/{}/{}/aws4_request", params.region, params.service);
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{amz_date}\n{scope}\n{}",
        hex::encode(Sha256::digest(canonical.as_bytes()))
    );

    let signing_key = cache.signing_key(
        params.secret_key,
        params.access_key,
        &date,
        params.region,
        params.service,
    );
    let signature = hex::encode(hmac(&signing_key, string_to_sign.as_bytes()));

    let authorization = format!(
        "AWS4-HMAC-SHA256 Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
        params.access_key
    );

    let mut out = vec![
        ("authorization".to_string(), authorization),
        ("x-amz-date".to_string(), amz_date),
        ("x-amz-content-sha256".to_string(), payload_hash(body)),
    ];
    if let Some(token) = params.session_token {
        out.push(("x-amz-security-token".to_string(), token.to_string()));
    }
    Ok(out)
}

#[cfg(test)]
#[path = "sigv4.test.rs"]
mod tests;
