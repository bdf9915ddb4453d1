use super::*;

#[test]
fn test_sentinel_is_stable() {
    // The sentinel is part of the update protocol: clients echo it back to
    // mean "unchanged". It must never vary between serializations.
    assert_eq!(SENTINEL, "***REDACTED***");
    assert!(is_redacted(SENTINEL));
    assert!(!is_redacted("sk-live-key"));
    assert!(!is_redacted(""));
}

#[test]
fn test_merge_secret() {
    assert_eq!(merge_secret("raw", SENTINEL), "raw");
    assert_eq!(merge_secret("raw", "new"), "new");
    assert_eq!(merge_secret("raw", ""), "");
}
