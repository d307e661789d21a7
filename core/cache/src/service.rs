//! TTL and size-bounded cache over the durable store.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::policy::{CacheStats, NamespacePolicy};
use momenta_storage::KeyValueStore;

/// Key prefix reserved for cache entries in the durable store.
pub const CACHE_PREFIX: &str = "cache_";

fn entry_key(namespace: &str, key: &str) -> String {
    format!("{}{}_{}", CACHE_PREFIX, namespace, key)
}

fn namespace_prefix(namespace: &str) -> String {
    format!("{}{}_", CACHE_PREFIX, namespace)
}

/// Persisted representation of one cache entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEnvelope {
    data: Value,
    written_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ttl_ms: Option<u64>,
}

impl CacheEnvelope {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.ttl_ms {
            Some(ttl_ms) => {
                now.signed_duration_since(self.written_at)
                    > chrono::Duration::milliseconds(ttl_ms as i64)
            }
            None => false,
        }
    }
}

/// Cache over the durable store with per-namespace TTL and size bounds.
///
/// The cache is advisory: every storage failure is logged and absorbed
/// into an absent or `false` result, never propagated to callers.
/// Expired entries are deleted lazily, on the read that finds them.
pub struct CacheService {
    store: Arc<dyn KeyValueStore>,
    policies: RwLock<HashMap<String, NamespacePolicy>>,
    /// Serializes put + eviction per namespace.
    namespace_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl CacheService {
    /// Create a cache service over the given store.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            policies: RwLock::new(HashMap::new()),
            namespace_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Register or overwrite a namespace's policy.
    ///
    /// Must be called before first use of a namespace if a non-default
    /// policy is desired.
    pub async fn configure(&self, namespace: &str, policy: NamespacePolicy) {
        debug!("cache namespace {} configured: {:?}", namespace, policy);
        self.policies
            .write()
            .await
            .insert(namespace.to_string(), policy);
    }

    /// Write `data` under `namespace`/`key`.
    ///
    /// Applies the namespace TTL at write time and enforces the entry
    /// bound afterwards by evicting the oldest writes. Returns `false`
    /// when the write was not stored.
    pub async fn put<T: Serialize + ?Sized>(&self, namespace: &str, key: &str, data: &T) -> bool {
        let data = match serde_json::to_value(data) {
            Ok(value) => value,
            Err(e) => {
                warn!("cache put {}/{} failed to serialize: {}", namespace, key, e);
                return false;
            }
        };

        let policy = self
            .policies
            .read()
            .await
            .get(namespace)
            .cloned()
            .unwrap_or_default();

        let envelope = CacheEnvelope {
            data,
            written_at: Utc::now(),
            ttl_ms: policy.ttl.map(|ttl| ttl.as_millis() as u64),
        };
        let json = match serde_json::to_string(&envelope) {
            Ok(json) => json,
            Err(e) => {
                warn!("cache put {}/{} failed to serialize: {}", namespace, key, e);
                return false;
            }
        };

        // One logical unit per namespace: the write and its eviction pass.
        let lock = self.namespace_lock(namespace).await;
        let _guard = lock.lock().await;

        if let Err(e) = self.store.set(&entry_key(namespace, key), &json).await {
            warn!("cache put {}/{} failed: {}", namespace, key, e);
            return false;
        }

        if let Some(max_entries) = policy.max_entries {
            self.enforce_bound(namespace, max_entries).await;
        }

        true
    }

    /// Read the entry under `namespace`/`key`.
    ///
    /// Returns `None` for absent, expired, or unreadable entries; expired
    /// and unreadable entries are deleted on the way out.
    pub async fn get<T: DeserializeOwned>(&self, namespace: &str, key: &str) -> Option<T> {
        let storage_key = entry_key(namespace, key);

        let raw = match self.store.get(&storage_key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("cache read {}/{} failed: {}", namespace, key, e);
                return None;
            }
        };

        let envelope: CacheEnvelope = match serde_json::from_str(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("cache entry {}/{} is corrupt, dropping: {}", namespace, key, e);
                self.drop_entry(&storage_key).await;
                return None;
            }
        };

        if envelope.is_expired(Utc::now()) {
            debug!("cache entry {}/{} expired, dropping", namespace, key);
            self.drop_entry(&storage_key).await;
            return None;
        }

        match serde_json::from_value(envelope.data) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(
                    "cache entry {}/{} does not match requested type: {}",
                    namespace, key, e
                );
                None
            }
        }
    }

    /// Delete the entry under `namespace`/`key` unconditionally.
    pub async fn invalidate(&self, namespace: &str, key: &str) -> bool {
        match self.store.delete(&entry_key(namespace, key)).await {
            Ok(()) => true,
            Err(e) => {
                warn!("cache invalidate {}/{} failed: {}", namespace, key, e);
                false
            }
        }
    }

    /// Delete every cache entry across all namespaces.
    ///
    /// Only keys carrying the cache prefix are touched; unrelated
    /// persisted state (the sync queue's key included) is left alone.
    /// Returns the number of entries deleted.
    pub async fn invalidate_all(&self) -> usize {
        let keys = match self.store.list_keys().await {
            Ok(keys) => keys,
            Err(e) => {
                warn!("cache invalidate_all scan failed: {}", e);
                return 0;
            }
        };

        let doomed: Vec<String> = keys
            .into_iter()
            .filter(|k| k.starts_with(CACHE_PREFIX))
            .collect();
        if doomed.is_empty() {
            return 0;
        }

        match self.store.delete_many(&doomed).await {
            Ok(()) => {
                debug!("invalidated {} cache entries", doomed.len());
                doomed.len()
            }
            Err(e) => {
                warn!("cache invalidate_all failed: {}", e);
                0
            }
        }
    }

    /// Compute aggregate diagnostics over all cache entries.
    pub async fn stats(&self) -> CacheStats {
        let keys = match self.store.list_keys().await {
            Ok(keys) => keys,
            Err(e) => {
                warn!("cache stats scan failed: {}", e);
                return CacheStats::default();
            }
        };

        let mut stats = CacheStats::default();
        for key in keys.into_iter().filter(|k| k.starts_with(CACHE_PREFIX)) {
            match self.store.get(&key).await {
                Ok(Some(raw)) => {
                    stats.total_items += 1;
                    stats.total_size_bytes += raw.len() as u64;
                }
                Ok(None) => {}
                Err(e) => warn!("cache stats read of {} failed: {}", key, e),
            }
        }

        stats
    }

    /// Get the per-namespace write lock, creating it on first use.
    async fn namespace_lock(&self, namespace: &str) -> Arc<Mutex<()>> {
        let mut locks = self.namespace_locks.lock().await;
        locks
            .entry(namespace.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Evict the oldest entries beyond `max_entries`.
    ///
    /// Oldest-first by write time, not access time.
    async fn enforce_bound(&self, namespace: &str, max_entries: usize) {
        let prefix = namespace_prefix(namespace);

        let keys = match self.store.list_keys().await {
            Ok(keys) => keys,
            Err(e) => {
                warn!("cache eviction scan for {} failed: {}", namespace, e);
                return;
            }
        };

        let mut entries: Vec<(String, DateTime<Utc>)> = Vec::new();
        for key in keys.into_iter().filter(|k| k.starts_with(&prefix)) {
            let raw = match self.store.get(&key).await {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(e) => {
                    warn!("cache eviction read of {} failed: {}", key, e);
                    continue;
                }
            };
            match serde_json::from_str::<CacheEnvelope>(&raw) {
                Ok(envelope) => entries.push((key, envelope.written_at)),
                Err(e) => warn!("cache entry {} is unreadable: {}", key, e),
            }
        }

        if entries.len() <= max_entries {
            return;
        }

        entries.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        let excess = entries.len() - max_entries;
        let doomed: Vec<String> = entries.into_iter().take(excess).map(|(k, _)| k).collect();

        debug!(
            "evicting {} oldest entries from cache namespace {}",
            doomed.len(),
            namespace
        );
        if let Err(e) = self.store.delete_many(&doomed).await {
            warn!("cache eviction for {} failed: {}", namespace, e);
        }
    }

    async fn drop_entry(&self, storage_key: &str) {
        if let Err(e) = self.store.delete(storage_key).await {
            warn!("failed to drop cache entry {}: {}", storage_key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use momenta_storage::{LocalStore, MemoryStore};
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct TaskSummary {
        id: u32,
        title: String,
    }

    fn service() -> (Arc<MemoryStore>, CacheService) {
        let store = Arc::new(MemoryStore::new());
        let cache = CacheService::new(store.clone());
        (store, cache)
    }

    /// Write an envelope with a chosen timestamp straight to the store.
    async fn seed_entry(
        store: &MemoryStore,
        namespace: &str,
        key: &str,
        data: Value,
        written_at: DateTime<Utc>,
        ttl_ms: Option<u64>,
    ) {
        let envelope = CacheEnvelope {
            data,
            written_at,
            ttl_ms,
        };
        store
            .set(
                &entry_key(namespace, key),
                &serde_json::to_string(&envelope).unwrap(),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let (_store, cache) = service();

        let task = TaskSummary {
            id: 7,
            title: "water the plants".to_string(),
        };
        assert!(cache.put("tasks", "today", &task).await);

        let restored: Option<TaskSummary> = cache.get("tasks", "today").await;
        assert_eq!(restored, Some(task));
    }

    #[tokio::test]
    async fn test_get_absent() {
        let (_store, cache) = service();
        let value: Option<TaskSummary> = cache.get("tasks", "missing").await;
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_fresh_entry_with_ttl_is_returned() {
        let (_store, cache) = service();
        cache
            .configure(
                "moods",
                NamespacePolicy::new().with_ttl(Duration::from_secs(60)),
            )
            .await;

        assert!(cache.put("moods", "latest", &"calm").await);
        let value: Option<String> = cache.get("moods", "latest").await;
        assert_eq!(value.as_deref(), Some("calm"));
    }

    #[tokio::test]
    async fn test_expired_entry_is_deleted_on_read() {
        let (store, cache) = service();
        cache
            .configure(
                "moods",
                NamespacePolicy::new().with_ttl(Duration::from_millis(1000)),
            )
            .await;

        // Entry written 1500ms in the past with a 1000ms TTL.
        seed_entry(
            &store,
            "moods",
            "latest",
            Value::String("tired".to_string()),
            Utc::now() - chrono::Duration::milliseconds(1500),
            Some(1000),
        )
        .await;

        let value: Option<String> = cache.get("moods", "latest").await;
        assert!(value.is_none());

        // Physical deletion happened on the read.
        let keys = store.list_keys().await.unwrap();
        assert!(!keys.contains(&entry_key("moods", "latest")));
    }

    #[tokio::test]
    async fn test_entry_within_ttl_survives() {
        let (store, cache) = service();

        seed_entry(
            &store,
            "moods",
            "latest",
            Value::String("fine".to_string()),
            Utc::now() - chrono::Duration::milliseconds(500),
            Some(1000),
        )
        .await;

        let value: Option<String> = cache.get("moods", "latest").await;
        assert_eq!(value.as_deref(), Some("fine"));
    }

    #[tokio::test]
    async fn test_oldest_first_eviction() {
        let (store, cache) = service();
        cache
            .configure("stats", NamespacePolicy::new().with_max_entries(2))
            .await;

        assert!(cache.put("stats", "monday", &1).await);
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(cache.put("stats", "tuesday", &2).await);
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(cache.put("stats", "wednesday", &3).await);

        let keys = store.list_keys().await.unwrap();
        assert!(!keys.contains(&entry_key("stats", "monday")));
        assert!(keys.contains(&entry_key("stats", "tuesday")));
        assert!(keys.contains(&entry_key("stats", "wednesday")));
    }

    #[tokio::test]
    async fn test_unconfigured_namespace_is_unbounded() {
        let (store, cache) = service();

        for i in 0..5 {
            assert!(cache.put("free", &format!("k{}", i), &i).await);
        }

        let count = store
            .list_keys()
            .await
            .unwrap()
            .iter()
            .filter(|k| k.starts_with(&namespace_prefix("free")))
            .count();
        assert_eq!(count, 5);
    }

    #[tokio::test]
    async fn test_invalidate() {
        let (_store, cache) = service();

        assert!(cache.put("tasks", "today", &1).await);
        assert!(cache.invalidate("tasks", "today").await);

        let value: Option<u32> = cache.get("tasks", "today").await;
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_all_spares_unrelated_keys() {
        let (store, cache) = service();

        store
            .set("offline-storage", "{\"sync_queue\":[]}")
            .await
            .unwrap();
        assert!(cache.put("tasks", "today", &1).await);
        assert!(cache.put("moods", "latest", &"ok").await);

        let removed = cache.invalidate_all().await;
        assert_eq!(removed, 2);

        let keys = store.list_keys().await.unwrap();
        assert_eq!(keys, vec!["offline-storage"]);
    }

    #[tokio::test]
    async fn test_corrupt_entry_dropped_on_read() {
        let (store, cache) = service();

        store
            .set(&entry_key("tasks", "bad"), "not json")
            .await
            .unwrap();

        let value: Option<u32> = cache.get("tasks", "bad").await;
        assert!(value.is_none());
        assert!(store.list_keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stats_counts_entries_and_bytes() {
        let (_store, cache) = service();

        assert!(cache.put("tasks", "a", &1).await);
        assert!(cache.put("tasks", "b", &2).await);

        let stats = cache.stats().await;
        assert_eq!(stats.total_items, 2);
        assert!(stats.total_size_bytes > 0);
    }

    #[tokio::test]
    async fn test_roundtrip_over_local_store() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(LocalStore::new(temp.path()).unwrap());
        let cache = CacheService::new(store);

        let task = TaskSummary {
            id: 1,
            title: "stretch".to_string(),
        };
        assert!(cache.put("tasks", "next", &task).await);

        let restored: Option<TaskSummary> = cache.get("tasks", "next").await;
        assert_eq!(restored, Some(task));
    }
}
