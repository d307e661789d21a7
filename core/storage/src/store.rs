//! Key-value store trait definition.

use async_trait::async_trait;

use momenta_common::Result;

/// Durable string-keyed storage backend.
///
/// All operations are async and may fail on any call; callers decide
/// whether a failure is propagated or absorbed. Values are textually
/// encoded by the layers above (JSON today).
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get the backend name (e.g., "memory", "local").
    fn name(&self) -> &str;

    /// Read the value stored under `key`.
    ///
    /// # Postconditions
    /// - Returns `None` when the key has never been written or was deleted
    ///
    /// # Errors
    /// - I/O or backend failures
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete the value under `key`.
    ///
    /// Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// List every key currently present in the store.
    async fn list_keys(&self) -> Result<Vec<String>>;

    /// Delete a batch of keys.
    ///
    /// Absent keys are skipped; the first backend failure aborts the batch.
    async fn delete_many(&self, keys: &[String]) -> Result<()> {
        for key in keys {
            self.delete(key).await?;
        }
        Ok(())
    }
}
