//! Provider runtime construction, reconfiguration, and teardown.

use crate::pool::WorkerPool;
use crate::providers::build_adapter;
use bifrost_error::BifrostError;
use bifrost_protocol::ConcurrencyAndBufferSize;
use bifrost_protocol::Provider;
use bifrost_protocol::ProviderConfig;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::RwLock;
use tokio::sync::Mutex;
use tracing::info;

/// A configured provider: its live config and the pool dispatching to its
/// adapter.
pub struct ProviderRuntime {
    config: Arc<RwLock<ProviderConfig>>,
    pool: Arc<WorkerPool>,
}

impl ProviderRuntime {
    /// The worker pool serving this provider.
    pub fn pool(&self) -> Arc<WorkerPool> {
        self.pool.clone()
    }

    /// Snapshot of the provider config.
    pub fn config_snapshot(&self) -> ProviderConfig {
        self.config.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Registry of configured providers.
///
/// Read-mostly: dispatch takes the shared lock; updates swap entries
/// atomically under the write lock. Updates to one provider serialize on
/// that provider's update mutex; different providers update concurrently.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<HashMap<Provider, Arc<ProviderRuntime>>>,
    update_locks: std::sync::Mutex<HashMap<Provider, Arc<Mutex<()>>>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn update_lock(&self, provider: &Provider) -> Arc<Mutex<()>> {
        self.update_locks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(provider.clone())
            .or_default()
            .clone()
    }

    /// Look up the runtime serving a provider.
    pub fn get(&self, provider: &Provider) -> Option<Arc<ProviderRuntime>> {
        self.providers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(provider)
            .cloned()
    }

    /// Providers currently configured, sorted by name.
    pub fn configured_providers(&self) -> Vec<Provider> {
        let mut providers: Vec<Provider> = self
            .providers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        providers.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        providers
    }

    /// Configure a new provider: build its adapter and spawn its pool.
    pub async fn add_provider(
        &self,
        provider: Provider,
        config: ProviderConfig,
    ) -> Result<(), BifrostError> {
        config.validate()?;
        let lock = self.update_lock(&provider);
        let _guard = lock.lock().await;

        if self.get(&provider).is_some() {
            return Err(BifrostError::validation(format!(
                "provider {provider} is already configured"
            )));
        }

        let adapter = build_adapter(&provider, &config)?;
        let config = Arc::new(RwLock::new(config));
        let pool = Arc::new(WorkerPool::spawn(
            provider.clone(),
            adapter,
            config.clone(),
        ));

        self.providers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(provider.clone(), Arc::new(ProviderRuntime { config, pool }));
        info!(provider = %provider, "provider configured");
        Ok(())
    }

    /// Resize a provider's pool.
    ///
    /// The invariant `concurrency <= buffer_size` is validated up front
    /// and violations are rejected, not clamped. A new pool spawns with
    /// the requested sizing, the registry entry swaps atomically, and the
    /// old pool drains in the background.
    pub async fn update_provider_concurrency(
        &self,
        provider: &Provider,
        sizing: ConcurrencyAndBufferSize,
    ) -> Result<(), BifrostError> {
        sizing.validate()?;
        let lock = self.update_lock(provider);
        let _guard = lock.lock().await;

        let runtime = self.get(provider).ok_or_else(|| {
            BifrostError::validation(format!("provider {provider} is not configured"))
        })?;

        {
            let mut config = runtime.config.write().unwrap_or_else(|e| e.into_inner());
            config.concurrency_and_buffer_size = sizing;
        }

        let new_pool = Arc::new(WorkerPool::spawn(
            provider.clone(),
            runtime.pool.adapter(),
            runtime.config.clone(),
        ));
        let new_runtime = Arc::new(ProviderRuntime {
            config: runtime.config.clone(),
            pool: new_pool,
        });

        self.providers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(provider.clone(), new_runtime);

        // Drain the replaced pool off the update path.
        let old_pool = runtime.pool.clone();
        tokio::spawn(async move { old_pool.shutdown().await });
        info!(
            provider = %provider,
            concurrency = sizing.concurrency,
            buffer_size = sizing.buffer_size,
            "provider pool resized"
        );
        Ok(())
    }

    /// Flip a provider's queue drop policy.
    pub fn update_drop_excess_requests(
        &self,
        provider: &Provider,
        drop_excess: bool,
    ) -> Result<(), BifrostError> {
        let runtime = self.get(provider).ok_or_else(|| {
            BifrostError::validation(format!("provider {provider} is not configured"))
        })?;
        runtime
            .config
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .drop_excess_requests = drop_excess;
        Ok(())
    }

    /// Remove a provider and drain its pool.
    pub async fn remove_provider(&self, provider: &Provider) -> Result<(), BifrostError> {
        let lock = self.update_lock(provider);
        let _guard = lock.lock().await;

        let runtime = self
            .providers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(provider)
            .ok_or_else(|| {
                BifrostError::validation(format!("provider {provider} is not configured"))
            })?;

        runtime.pool.shutdown().await;
        info!(provider = %provider, "provider removed");
        Ok(())
    }

    /// Drain every provider pool. Called at gateway shutdown.
    pub async fn shutdown(&self) {
        let runtimes: Vec<Arc<ProviderRuntime>> = {
            let mut providers = self.providers.write().unwrap_or_else(|e| e.into_inner());
            providers.drain().map(|(_, runtime)| runtime).collect()
        };
        for runtime in runtimes {
            runtime.pool.shutdown().await;
        }
    }
}

#[cfg(test)]
#[path = "lifecycle.test.rs"]
mod tests;
