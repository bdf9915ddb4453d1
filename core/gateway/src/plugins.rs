//! Plugin pipeline with symmetric post-hook execution.
//!
//! Pre-hooks run in registration order and may rewrite the request or
//! short-circuit the upstream call. Post-hooks run in reverse order over
//! exactly the pre-hook prefix that executed, and may rewrite success into
//! failure or back. Hook failures are logged through `tracing` and never
//! surface to callers.

use async_trait::async_trait;
use bifrost_error::BifrostError;
use bifrost_protocol::BifrostRequest;
use bifrost_protocol::BifrostResponse;
use bifrost_protocol::RequestContext;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Result shape flowing through post-hooks.
pub type DispatchOutcome = Result<BifrostResponse, BifrostError>;

/// A pre-hook decision that bypasses the upstream call.
#[derive(Debug, Default)]
pub struct ShortCircuit {
    /// Canned response to return.
    pub response: Option<BifrostResponse>,
    /// Error to fail the hop with.
    pub error: Option<BifrostError>,
}

impl ShortCircuit {
    /// Short-circuit with a canned response.
    pub fn respond(response: BifrostResponse) -> Self {
        Self {
            response: Some(response),
            error: None,
        }
    }

    /// Short-circuit with an error.
    pub fn fail(error: BifrostError) -> Self {
        Self {
            response: None,
            error: Some(error),
        }
    }

    fn into_outcome(self) -> DispatchOutcome {
        match (self.response, self.error) {
            (Some(response), _) => Ok(response),
            (None, Some(error)) => Err(error),
            (None, None) => Err(BifrostError::operation(
                "plugin short-circuited with neither response nor error",
            )),
        }
    }
}

/// Rewrites an inbound transport request before normalized parsing.
///
/// Interceptors run only for `application/json` bodies; multipart streams
/// bypass interception so their bodies are never consumed early.
#[async_trait]
pub trait TransportInterceptor: Send + Sync {
    async fn intercept(
        &self,
        ctx: &RequestContext,
        uri: &str,
        headers: &mut HashMap<String, String>,
        body: &mut Value,
    ) -> Result<(), BifrostError>;
}

/// The plugin capability set.
#[allow(unused_variables)]
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Stable plugin name used in logs.
    fn name(&self) -> &str;

    /// Runs before dispatch, in registration order.
    ///
    /// May rewrite the request in place. Returning a [`ShortCircuit`]
    /// skips the upstream call and every later pre-hook. Returning an
    /// error is logged and excludes this plugin from the post-hook path.
    async fn pre_hook(
        &self,
        ctx: &mut RequestContext,
        request: &mut BifrostRequest,
    ) -> Result<Option<ShortCircuit>, BifrostError> {
        Ok(None)
    }

    /// Runs on the return path, in reverse registration order, once per
    /// executed pre-hook. May rewrite the outcome in place.
    async fn post_hook(
        &self,
        ctx: &mut RequestContext,
        outcome: &mut DispatchOutcome,
    ) -> Result<(), BifrostError> {
        Ok(())
    }

    /// Optional transport-level interceptor.
    fn transport_interceptor(&self) -> Option<Arc<dyn TransportInterceptor>> {
        None
    }

    /// Runs once at gateway shutdown.
    async fn cleanup(&self) -> Result<(), BifrostError> {
        Ok(())
    }
}

/// Result of running the pre-hook chain for one hop.
pub struct PreHookRun {
    /// How many pre-hooks executed; the post-hook pass covers exactly
    /// this prefix, reversed.
    pub executed: usize,
    /// Set when a plugin bypassed the upstream call.
    pub short_circuit: Option<ShortCircuit>,
}

/// Ordered plugin pipeline.
#[derive(Default)]
pub struct PluginPipeline {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PluginPipeline {
    /// Create a pipeline with the given plugins, in registration order.
    pub fn new(plugins: Vec<Arc<dyn Plugin>>) -> Self {
        Self { plugins }
    }

    /// Whether any plugins are registered.
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Run pre-hooks in order until completion or short-circuit.
    pub async fn run_pre_hooks(
        &self,
        ctx: &mut RequestContext,
        request: &mut BifrostRequest,
    ) -> PreHookRun {
        let mut executed = 0;
        for plugin in &self.plugins {
            match plugin.pre_hook(ctx, request).await {
                Ok(None) => executed += 1,
                Ok(Some(short_circuit)) => {
                    executed += 1;
                    return PreHookRun {
                        executed,
                        short_circuit: Some(short_circuit),
                    };
                }
                Err(err) => {
                    // Failed pre-hooks are excluded from the post-hook path.
                    warn!(plugin = plugin.name(), "pre-hook failed: {err}");
                }
            }
        }
        PreHookRun {
            executed,
            short_circuit: None,
        }
    }

    /// Run post-hooks over the executed prefix, in reverse order.
    pub async fn run_post_hooks(
        &self,
        ctx: &mut RequestContext,
        executed: usize,
        outcome: &mut DispatchOutcome,
    ) {
        for plugin in self.plugins[..executed].iter().rev() {
            if let Err(err) = plugin.post_hook(ctx, outcome).await {
                warn!(plugin = plugin.name(), "post-hook failed: {err}");
            }
        }
    }

    /// Resolve a short-circuit into the outcome post-hooks will see.
    pub fn short_circuit_outcome(&self, short_circuit: ShortCircuit) -> DispatchOutcome {
        short_circuit.into_outcome()
    }

    /// Apply every registered transport interceptor to an inbound request.
    ///
    /// Only `application/json` bodies are intercepted; any other content
    /// type passes through untouched.
    pub async fn run_transport_interceptors(
        &self,
        ctx: &RequestContext,
        uri: &str,
        content_type: &str,
        headers: &mut HashMap<String, String>,
        body: &mut Value,
    ) -> Result<(), BifrostError> {
        if !content_type.starts_with("application/json") {
            return Ok(());
        }
        for plugin in &self.plugins {
            if let Some(interceptor) = plugin.transport_interceptor() {
                interceptor.intercept(ctx, uri, headers, body).await?;
            }
        }
        Ok(())
    }

    /// Run every plugin's cleanup. Failures are logged, not surfaced.
    pub async fn cleanup(&self) {
        for plugin in &self.plugins {
            if let Err(err) = plugin.cleanup().await {
                warn!(plugin = plugin.name(), "cleanup failed: {err}");
            }
        }
    }
}

#[cfg(test)]
#[path = "plugins.test.rs"]
mod tests;
