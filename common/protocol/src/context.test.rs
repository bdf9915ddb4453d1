use super::*;

#[test]
fn test_fresh_context_defaults() {
    let ctx = RequestContext::new();
    assert!(ctx.deadline().is_none());
    assert!(ctx.remaining().is_none());
    assert!(!ctx.is_cancelled());
    assert!(!ctx.deadline_elapsed());
}

#[test]
fn test_values() {
    let mut ctx = RequestContext::new().with_value("tenant", serde_json::json!("acme"));
    assert_eq!(ctx.value("tenant"), Some(&serde_json::json!("acme")));
    assert_eq!(ctx.value("missing"), None);

    ctx.set_value(
        MCP_INCLUDE_TOOLS_KEY,
        serde_json::json!(["git-*", "search-lookup"]),
    );
    assert!(ctx.value(MCP_INCLUDE_TOOLS_KEY).is_some());
}

#[test]
fn test_deadline_remaining() {
    let ctx = RequestContext::new().with_timeout(Duration::from_secs(60));
    let remaining = ctx.remaining().expect("deadline set");
    assert!(remaining <= Duration::from_secs(60));
    assert!(remaining > Duration::from_secs(50));
    assert!(!ctx.deadline_elapsed());
}

#[test]
fn test_elapsed_deadline() {
    let ctx = RequestContext::new().with_deadline(Instant::now() - Duration::from_millis(1));
    assert!(ctx.deadline_elapsed());
    assert_eq!(ctx.remaining(), Some(Duration::ZERO));
}

#[test]
fn test_cancellation_shared_across_clones() {
    let ctx = RequestContext::new();
    let clone = ctx.clone();
    assert!(!clone.is_cancelled());

    ctx.cancel();
    assert!(clone.is_cancelled());
}

#[tokio::test]
async fn test_cancellation_wakes_waiters() {
    let ctx = RequestContext::new();
    let token = ctx.cancellation().clone();

    let waiter = tokio::spawn(async move {
        token.cancelled().await;
        true
    });

    ctx.cancel();
    assert!(waiter.await.expect("join"));
}
