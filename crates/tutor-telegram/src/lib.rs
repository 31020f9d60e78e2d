//! Telegram Bot API plumbing for the portal: a thin HTTP client, the
//! [`BotApi`] port it implements, and the single-consumer
//! [`PollingManager`] that ingests updates through long polling.

pub mod api;
pub mod client;
pub mod error;
pub mod handler;
pub mod polling;
pub mod retry;
pub mod types;

pub use api::BotApi;
pub use client::TelegramClient;
pub use error::TelegramError;
pub use handler::UpdateHandler;
pub use polling::{BotControl, ClearReport, PollingManager, PollingOptions, PollingPhase, PollingStatus};
pub use retry::RetryPolicy;
