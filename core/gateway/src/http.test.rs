use super::*;
use std::sync::Arc;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;

fn fast_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(5),
        backoff_multiplier: 2.0,
    }
}

#[test]
fn test_retry_config_from_network() {
    let network = NetworkConfig {
        max_retries: 2,
        retry_backoff_initial_ms: 250,
        retry_backoff_max_ms: 4_000,
        ..NetworkConfig::default()
    };
    let config = RetryConfig::from_network(&network);
    assert_eq!(config.max_attempts, 3);
    assert_eq!(config.initial_backoff, Duration::from_millis(250));
    assert_eq!(config.max_backoff, Duration::from_secs(4));
}

#[tokio::test]
async fn test_transient_errors_retry_until_success() {
    let executor = RetryExecutor::new(fast_retry(3));
    let attempts = Arc::new(AtomicU32::new(0));
    let ctx = bifrost_protocol::RequestContext::new();

    let counter = attempts.clone();
    let result = executor
        .execute(&ctx, move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(BifrostError::transport("connection reset"))
                } else {
                    Ok("served")
                }
            }
        })
        .await
        .expect("succeeds on third attempt");

    assert_eq!(result, "served");
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_attempts_are_bounded() {
    let executor = RetryExecutor::new(fast_retry(2));
    let attempts = Arc::new(AtomicU32::new(0));
    let ctx = bifrost_protocol::RequestContext::new();

    let counter = attempts.clone();
    let err = executor
        .execute(&ctx, move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(BifrostError::transport("still down"))
            }
        })
        .await
        .expect_err("exhausts attempts");

    assert_eq!(err.kind, bifrost_error::ErrorKind::Transport);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_non_retryable_errors_fail_fast() {
    let executor = RetryExecutor::new(fast_retry(5));
    let attempts = Arc::new(AtomicU32::new(0));
    let ctx = bifrost_protocol::RequestContext::new();

    let counter = attempts.clone();
    let err = executor
        .execute(&ctx, move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(BifrostError::provider_api(400, "bad request"))
            }
        })
        .await
        .expect_err("provider errors never retry");

    assert_eq!(err.kind, bifrost_error::ErrorKind::ProviderApi);
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_deadline_inside_backoff_window_stops_retrying() {
    let executor = RetryExecutor::new(RetryConfig {
        max_attempts: 3,
        initial_backoff: Duration::from_secs(60),
        max_backoff: Duration::from_secs(60),
        backoff_multiplier: 2.0,
    });
    let ctx = bifrost_protocol::RequestContext::new().with_timeout(Duration::from_millis(50));
    let attempts = Arc::new(AtomicU32::new(0));

    let counter = attempts.clone();
    let err = executor
        .execute(&ctx, move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(BifrostError::transport("reset"))
            }
        })
        .await
        .expect_err("no time for the backoff");

    // The transport error surfaces rather than a long sleep.
    assert_eq!(err.kind, bifrost_error::ErrorKind::Transport);
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancellation_interrupts_backoff() {
    let executor = RetryExecutor::new(RetryConfig {
        max_attempts: 3,
        initial_backoff: Duration::from_secs(30),
        max_backoff: Duration::from_secs(30),
        backoff_multiplier: 2.0,
    });
    let ctx = bifrost_protocol::RequestContext::new();

    let cancel_ctx = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel_ctx.cancel();
    });

    let err = executor
        .execute(&ctx, || async {
            Err::<(), _>(BifrostError::transport("reset"))
        })
        .await
        .expect_err("cancelled during backoff");
    assert_eq!(err.kind, bifrost_error::ErrorKind::Canceled);
}

#[tokio::test]
async fn test_upstream_retry_after_is_clamped() {
    let executor = RetryExecutor::new(RetryConfig {
        max_attempts: 2,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(10),
        backoff_multiplier: 2.0,
    });
    let ctx = bifrost_protocol::RequestContext::new();
    let attempts = Arc::new(AtomicU32::new(0));

    let counter = attempts.clone();
    let started = std::time::Instant::now();
    let _ = executor
        .execute(&ctx, move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    // Suggests a delay far above max_backoff.
                    Err(BifrostError::transport("overloaded")
                        .with_retry_after(Duration::from_secs(60)))
                } else {
                    Ok(())
                }
            }
        })
        .await;

    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn test_build_http_client_rejects_bad_proxy() {
    let network = NetworkConfig::default();
    let proxy = ProxyConfig {
        url: "::not a url::".to_string(),
        username: None,
        password: None,
    };
    assert!(build_http_client(&network, Some(&proxy)).is_err());
    assert!(build_http_client(&network, None).is_ok());
}
