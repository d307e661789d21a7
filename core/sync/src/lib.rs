//! Momenta Sync Engine
//!
//! This module provides the offline synchronization layer, including:
//! - A restart-safe FIFO queue of pending mutations
//! - A dead-letter log for actions that exhaust their retries
//! - A single-flight processor draining the queue against a remote endpoint
//! - A connectivity monitor that re-drains on reconnect

pub mod action;
pub mod endpoint;
pub mod http;
pub mod network;
pub mod processor;
pub mod queue;

// Re-export main types
pub use action::{SyncAction, SyncKind, DEFAULT_MAX_RETRIES};
pub use endpoint::SyncEndpoint;
pub use http::HttpEndpoint;
pub use network::{drain_on_reconnect, ConnectivitySubscription, NetworkMonitor, NetworkTransition};
pub use processor::{DrainOutcome, DrainReport, ProcessorConfig, SyncProcessor};
pub use queue::{DeadLetter, QueueStatus, RetryOutcome, SyncQueue, QUEUE_STORAGE_KEY};
