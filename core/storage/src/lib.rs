//! Durable storage abstraction for Momenta.
//!
//! This module provides a trait-based interface for the string-keyed
//! durable store the sync queue and cache persist through, plus a backend
//! registry for config-driven resolution.
//!
//! # Design Principles
//! - Backend isolation: No backend-specific logic in sync or cache modules
//! - Async operations: All I/O operations are async
//! - Failure on any call: Callers decide whether to propagate or absorb
//! - Disjoint ownership: Each consumer owns its own key range

pub mod store;
pub mod registry;
pub mod memory;
pub mod local;

pub use store::KeyValueStore;
pub use registry::{StoreRegistry, StoreFactory, create_default_registry};
pub use memory::MemoryStore;
pub use local::LocalStore;
