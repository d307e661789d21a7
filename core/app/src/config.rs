//! Core configuration.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use momenta_cache::NamespacePolicy;
use momenta_common::{Error, Result};

fn default_backend() -> String {
    "local".to_string()
}

fn default_max_retries() -> u32 {
    momenta_sync::DEFAULT_MAX_RETRIES
}

fn default_send_timeout_secs() -> u64 {
    30
}

/// Storage backend selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Backend name resolved through the store registry.
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Backend-specific configuration.
    #[serde(default)]
    pub config: Value,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            config: Value::Null,
        }
    }
}

/// Sync queue and processor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Retry budget for newly enqueued actions.
    #[serde(default = "default_max_retries")]
    pub default_max_retries: u32,
    /// Per-send time budget, in seconds.
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,
    /// Base URL for the HTTP sync endpoint, when one is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            default_max_retries: default_max_retries(),
            send_timeout_secs: default_send_timeout_secs(),
            endpoint_url: None,
        }
    }
}

impl SyncSettings {
    /// Per-send time budget as a duration.
    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }
}

/// Policy for one cache namespace, registered at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceSettings {
    /// Namespace name.
    pub namespace: String,
    /// Entry time-to-live, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_ms: Option<u64>,
    /// Entry-count bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_entries: Option<usize>,
}

impl NamespaceSettings {
    /// Convert to a cache policy.
    pub fn policy(&self) -> NamespacePolicy {
        NamespacePolicy {
            ttl: self.ttl_ms.map(Duration::from_millis),
            max_entries: self.max_entries,
        }
    }
}

/// Top-level configuration for the offline core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoreConfig {
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub cache_namespaces: Vec<NamespaceSettings>,
}

impl CoreConfig {
    /// Serialize configuration to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = CoreConfig::from_json("{}").unwrap();

        assert_eq!(config.storage.backend, "local");
        assert_eq!(config.sync.default_max_retries, 3);
        assert_eq!(config.sync.send_timeout(), Duration::from_secs(30));
        assert!(config.cache_namespaces.is_empty());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = CoreConfig {
            storage: StorageSettings {
                backend: "memory".to_string(),
                config: Value::Null,
            },
            sync: SyncSettings {
                default_max_retries: 5,
                send_timeout_secs: 10,
                endpoint_url: Some("https://api.example.com/v1/".to_string()),
            },
            cache_namespaces: vec![NamespaceSettings {
                namespace: "tasks".to_string(),
                ttl_ms: Some(60_000),
                max_entries: Some(50),
            }],
        };

        let json = config.to_json().unwrap();
        let restored = CoreConfig::from_json(&json).unwrap();

        assert_eq!(restored.storage.backend, "memory");
        assert_eq!(restored.sync.default_max_retries, 5);
        assert_eq!(restored.cache_namespaces.len(), 1);
        assert_eq!(
            restored.cache_namespaces[0].policy().ttl,
            Some(Duration::from_millis(60_000))
        );
    }

    #[test]
    fn test_invalid_json_fails() {
        assert!(CoreConfig::from_json("not json").is_err());
    }
}
