//! Local filesystem store.

use async_trait::async_trait;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;

use crate::store::KeyValueStore;
use momenta_common::Result;

/// Characters that are unsafe in file names on at least one platform,
/// plus '%' so encoded names round-trip.
const FILE_NAME_ENCODE: &AsciiSet = &CONTROLS
    .add(b'%')
    .add(b'/')
    .add(b'\\')
    .add(b':')
    .add(b'*')
    .add(b'?')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'|')
    .add(b' ');

/// File-backed key-value store.
///
/// Stores one file per key under a root directory, with keys
/// percent-encoded into file names.
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Create a new local store with the given root directory.
    ///
    /// # Postconditions
    /// - Root directory is created if it doesn't exist
    ///
    /// # Errors
    /// - Invalid path
    /// - Permission denied
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        // Create root if it doesn't exist (sync for constructor)
        if !root.exists() {
            std::fs::create_dir_all(&root)?;
        }

        Ok(Self { root })
    }

    /// Default root under the platform-local data directory.
    pub fn default_root() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("momenta")
    }

    /// Convert a store key to a filesystem path.
    fn to_fs_path(&self, key: &str) -> PathBuf {
        let encoded = utf8_percent_encode(key, FILE_NAME_ENCODE).to_string();
        self.root.join(encoded)
    }
}

#[async_trait]
impl KeyValueStore for LocalStore {
    fn name(&self) -> &str {
        "local"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.to_fs_path(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::write(self.to_fs_path(key), value).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.to_fs_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            if !entry.path().is_file() {
                continue;
            }

            let name = entry.file_name();
            let Some(encoded) = name.to_str() else {
                warn!("skipping store file with non-UTF-8 name");
                continue;
            };

            match percent_decode_str(encoded).decode_utf8() {
                Ok(key) => keys.push(key.into_owned()),
                Err(_) => warn!("skipping store file with undecodable name: {}", encoded),
            }
        }

        Ok(keys)
    }
}
