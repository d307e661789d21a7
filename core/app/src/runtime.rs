//! Process-wide wiring for the offline core.

use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use momenta_cache::CacheService;
use momenta_common::{Error, Result};
use momenta_storage::{create_default_registry, KeyValueStore};
use momenta_sync::{
    drain_on_reconnect, ConnectivitySubscription, DrainReport, HttpEndpoint, NetworkMonitor,
    ProcessorConfig, QueueStatus, SyncAction, SyncEndpoint, SyncKind, SyncProcessor, SyncQueue,
};

use crate::config::CoreConfig;

/// The offline core: queue, processor, cache, and monitor wired together.
///
/// Constructed once at process start and passed by reference to all
/// consumers; every collaborator is injected, nothing is global.
pub struct OfflineCore {
    store: Arc<dyn KeyValueStore>,
    cache: Arc<CacheService>,
    queue: Arc<SyncQueue>,
    processor: Arc<SyncProcessor>,
    monitor: Arc<NetworkMonitor>,
    default_max_retries: u32,
}

impl OfflineCore {
    /// Build the core from config with an injected endpoint.
    ///
    /// Resolves the storage backend through the registry, restores the
    /// queue from it, and registers the configured cache namespaces.
    pub async fn bootstrap(config: &CoreConfig, endpoint: Arc<dyn SyncEndpoint>) -> Result<Self> {
        let registry = create_default_registry();
        let store = registry.resolve(&config.storage.backend, config.storage.config.clone())?;
        debug!("offline core using {} storage backend", store.name());

        let queue = Arc::new(SyncQueue::load(store.clone()).await);
        let monitor = Arc::new(NetworkMonitor::new(true));
        let processor = Arc::new(SyncProcessor::new(
            queue.clone(),
            endpoint,
            monitor.clone(),
            ProcessorConfig {
                send_timeout: config.sync.send_timeout(),
            },
        ));

        let cache = Arc::new(CacheService::new(store.clone()));
        for settings in &config.cache_namespaces {
            cache.configure(&settings.namespace, settings.policy()).await;
        }

        Ok(Self {
            store,
            cache,
            queue,
            processor,
            monitor,
            default_max_retries: config.sync.default_max_retries,
        })
    }

    /// Build the core with the HTTP endpoint from `sync.endpoint_url`.
    pub async fn bootstrap_http(config: &CoreConfig) -> Result<Self> {
        let url = config.sync.endpoint_url.as_deref().ok_or_else(|| {
            Error::InvalidInput("sync.endpoint_url is required for the HTTP endpoint".to_string())
        })?;
        let endpoint = Arc::new(HttpEndpoint::new(url)?);
        Self::bootstrap(config, endpoint).await
    }

    /// Queue a mutation with the configured retry budget and attempt an
    /// immediate drain (a no-op while offline or already draining).
    pub async fn enqueue(&self, kind: SyncKind, payload: Value) -> SyncAction {
        let action = self
            .queue
            .enqueue(kind, payload, self.default_max_retries)
            .await;
        self.processor.process().await;
        action
    }

    /// Drain the queue now.
    pub async fn drain(&self) -> DrainReport {
        self.processor.process().await
    }

    /// Install the drain-on-reconnect bridge.
    ///
    /// The returned subscription must be kept alive for the bridge to
    /// run; shutting it down (or dropping it) tears the task down.
    pub fn connect_monitor(&self) -> ConnectivitySubscription {
        drain_on_reconnect(&self.monitor, self.processor.clone())
    }

    /// The cache layer.
    pub fn cache(&self) -> &CacheService {
        &self.cache
    }

    /// The connectivity monitor.
    pub fn monitor(&self) -> &NetworkMonitor {
        &self.monitor
    }

    /// The sync queue.
    pub fn queue(&self) -> &SyncQueue {
        &self.queue
    }

    /// Pending and dead-lettered action counts.
    pub async fn queue_status(&self) -> QueueStatus {
        self.queue.status().await
    }

    /// The underlying durable store.
    pub fn store(&self) -> Arc<dyn KeyValueStore> {
        self.store.clone()
    }
}
