use async_trait::async_trait;

use crate::types::Update;

/// Receives every update the poll loop fetches, in `update_id` order.
///
/// An error is logged by the caller; the offset still moves past the update.
#[async_trait]
pub trait UpdateHandler: Send + Sync {
    async fn handle(&self, update: Update) -> anyhow::Result<()>;
}
