use super::*;

#[test]
fn test_policy_table() {
    assert!(ErrorKind::Transport.policy().retryable);
    assert!(ErrorKind::Transport.policy().skips_hop);

    for kind in [
        ErrorKind::UnsupportedOperation,
        ErrorKind::NoEligibleKey,
        ErrorKind::QueueFull,
        ErrorKind::ProviderApi,
        ErrorKind::Decode,
        ErrorKind::Operation,
    ] {
        let policy = kind.policy();
        assert!(policy.skips_hop, "{kind} should skip to the next hop");
        assert!(!policy.retryable, "{kind} should not retry within a hop");
    }

    for kind in [
        ErrorKind::Validation,
        ErrorKind::Canceled,
        ErrorKind::DeadlineExceeded,
        ErrorKind::ShuttingDown,
    ] {
        assert!(kind.policy().terminal, "{kind} should stop the call");
    }
}

#[test]
fn test_internal_classification() {
    assert!(ErrorKind::Validation.is_internal());
    assert!(ErrorKind::Operation.is_internal());
    assert!(ErrorKind::ShuttingDown.is_internal());
    assert!(!ErrorKind::Transport.is_internal());
    assert!(!ErrorKind::ProviderApi.is_internal());
    assert!(!ErrorKind::Decode.is_internal());
}

#[test]
fn test_display_names() {
    assert_eq!(ErrorKind::QueueFull.to_string(), "queue_full");
    assert_eq!(ErrorKind::ProviderApi.to_string(), "provider_api");
    assert_eq!(
        ErrorKind::UnsupportedOperation.to_string(),
        "unsupported_operation"
    );
}
