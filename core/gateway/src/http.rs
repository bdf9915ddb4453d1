//! Shared HTTP client construction and retry policy.
//!
//! Each adapter owns one reusable client tuned from its provider's
//! `NetworkConfig`. Retries apply to transient transport failures only,
//! with exponential backoff clamped to the configured window and bounded
//! by the request deadline.

use bifrost_error::BifrostError;
use bifrost_protocol::NetworkConfig;
use bifrost_protocol::ProxyConfig;
use bifrost_protocol::RequestContext;
use std::time::Duration;
use tracing::debug;

/// Idle connections are kept warm for this long before the pool drops them.
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Per-host cap on pooled connections.
const POOL_MAX_IDLE_PER_HOST: usize = 32;

/// Build the reusable HTTP client for one provider.
pub fn build_http_client(
    network: &NetworkConfig,
    proxy: Option<&ProxyConfig>,
) -> Result<reqwest::Client, BifrostError> {
    let mut builder = reqwest::Client::builder()
        .timeout(Duration::from_secs(network.timeout_secs))
        .pool_idle_timeout(POOL_IDLE_TIMEOUT)
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST);

    if let Some(proxy) = proxy {
        let mut p = reqwest::Proxy::all(&proxy.url)
            .map_err(|err| BifrostError::validation(format!("invalid proxy url: {err}")))?;
        if let (Some(user), Some(pass)) = (proxy.username.as_deref(), proxy.password.as_deref()) {
            p = p.basic_auth(user, pass);
        }
        builder = builder.proxy(p);
    }

    builder
        .build()
        .map_err(|err| BifrostError::operation(format!("http client construction: {err}")))
}

/// Retry configuration with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (1 = no retry).
    pub max_attempts: u32,
    /// Initial backoff delay.
    pub initial_backoff: Duration,
    /// Maximum backoff delay.
    pub max_backoff: Duration,
    /// Backoff multiplier.
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Derive the retry window from a provider's network config.
    pub fn from_network(network: &NetworkConfig) -> Self {
        Self {
            max_attempts: network.max_retries + 1,
            initial_backoff: Duration::from_millis(network.retry_backoff_initial_ms),
            max_backoff: Duration::from_millis(network.retry_backoff_max_ms),
            backoff_multiplier: 2.0,
        }
    }
}

/// Retry executor bounded by the request context.
#[derive(Debug)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    /// Create an executor with the given configuration.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Execute an operation, retrying transient transport failures.
    ///
    /// Gives up when the error is not retryable, attempts are exhausted,
    /// the context is cancelled, or the deadline would elapse before the
    /// backoff completes.
    pub async fn execute<F, Fut, T>(
        &self,
        ctx: &RequestContext,
        mut operation: F,
    ) -> Result<T, BifrostError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, BifrostError>>,
    {
        let mut attempt: u32 = 1;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(error) => {
                    if !error.is_retryable() || attempt >= self.config.max_attempts {
                        return Err(error);
                    }

                    let delay = self.delay_for(attempt, &error);
                    if let Some(remaining) = ctx.remaining()
                        && remaining <= delay
                    {
                        debug!("skipping retry: deadline inside backoff window");
                        return Err(error);
                    }

                    debug!(attempt, ?delay, "retrying after transport error");
                    tokio::select! {
                        _ = ctx.cancellation().cancelled() => return Err(BifrostError::canceled()),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
            }
        }
    }

    fn delay_for(&self, attempt: u32, error: &BifrostError) -> Duration {
        // Honor an upstream-suggested delay when one was parsed.
        if let Some(delay) = error.retry_after {
            return delay.min(self.config.max_backoff);
        }
        let backoff = self.config.initial_backoff.as_secs_f64()
            * self.config.backoff_multiplier.powi(attempt as i32 - 1);
        Duration::from_secs_f64(backoff.min(self.config.max_backoff.as_secs_f64()))
            .max(self.config.initial_backoff)
    }
}

/// Merge provider-level extra headers into an outbound request.
pub fn apply_extra_headers(
    mut request: reqwest::RequestBuilder,
    network: &NetworkConfig,
) -> reqwest::RequestBuilder {
    for (name, value) in &network.extra_headers {
        request = request.header(name, value);
    }
    request
}

#[cfg(test)]
#[path = "http.test.rs"]
mod tests;
