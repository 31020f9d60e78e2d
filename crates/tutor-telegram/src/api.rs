use async_trait::async_trait;

use crate::error::TelegramError;
use crate::types::{Update, WebhookInfo};

/// Port over the Bot API methods the portal uses.
///
/// Non-ok responses come back as [`TelegramError`]; a 409 from `getUpdates`
/// is [`TelegramError::Conflict`], meaning another consumer is polling.
#[async_trait]
pub trait BotApi: Send + Sync {
    async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
        limit: u32,
    ) -> Result<Vec<Update>, TelegramError>;

    /// Returns `true` once Telegram accepted the message.
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<bool, TelegramError>;

    async fn delete_webhook(&self, drop_pending_updates: bool) -> Result<bool, TelegramError>;

    async fn get_webhook_info(&self) -> Result<WebhookInfo, TelegramError>;
}
