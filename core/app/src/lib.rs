//! Momenta offline core wiring.
//!
//! Composition layer over the storage, cache, and sync crates: loads the
//! config, resolves the storage backend, and hands out one fully wired
//! `OfflineCore`.

pub mod config;
pub mod logging;
pub mod runtime;

pub use config::{CoreConfig, NamespaceSettings, StorageSettings, SyncSettings};
pub use logging::init_logging;
pub use runtime::OfflineCore;
