//! Remote sync endpoint trait definition.

use async_trait::async_trait;

use crate::action::SyncAction;
use momenta_common::Result;

/// Remote endpoint that applies queued mutations.
///
/// Delivery is at-least-once: the processor may retry an action the
/// endpoint already applied, and nothing in this layer deduplicates.
#[async_trait]
pub trait SyncEndpoint: Send + Sync {
    /// Get the endpoint name (e.g., "http").
    fn name(&self) -> &str;

    /// Deliver one action to the remote side.
    ///
    /// # Postconditions
    /// - `Ok(())` means the remote accepted the mutation
    ///
    /// # Errors
    /// - Network/transport failures
    /// - Remote rejection
    async fn send(&self, action: &SyncAction) -> Result<()>;
}
