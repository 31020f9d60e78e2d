use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::api::BotApi;
use crate::error::TelegramError;
use crate::types::{
    ApiResponse, DeleteWebhookParams, GetUpdatesParams, Message, SendMessageParams, Update,
    WebhookInfo,
};

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Slack added on top of the long-poll timeout before the HTTP client gives up.
const REQUEST_TIMEOUT_MARGIN_SECS: u64 = 10;

const ALLOWED_UPDATES: &[&str] = &["message"];

/// reqwest-backed Bot API client. The token is fixed at construction.
#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    bot_url: String,
}

impl TelegramClient {
    pub fn new(api_base: &str, token: &str, poll_timeout_secs: u64) -> Result<Self, TelegramError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(
                poll_timeout_secs + REQUEST_TIMEOUT_MARGIN_SECS,
            ))
            .build()?;
        Ok(Self {
            http,
            bot_url: format!("{}/bot{}", api_base.trim_end_matches('/'), token),
        })
    }

    async fn call<P, T>(&self, method: &str, params: &P) -> Result<T, TelegramError>
    where
        P: Serialize + Sync,
        T: DeserializeOwned,
    {
        debug!(method, "telegram request");
        // Telegram answers errors with a JSON envelope too, so the body is
        // decoded regardless of the HTTP status.
        let response = self
            .http
            .post(format!("{}/{}", self.bot_url, method))
            .json(params)
            .send()
            .await?;
        let envelope: ApiResponse<T> = response.json().await?;
        envelope.into_result()
    }
}

#[async_trait]
impl BotApi for TelegramClient {
    async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
        limit: u32,
    ) -> Result<Vec<Update>, TelegramError> {
        let params = GetUpdatesParams {
            offset,
            timeout: timeout_secs,
            limit,
            allowed_updates: ALLOWED_UPDATES,
        };
        self.call("getUpdates", &params).await
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<bool, TelegramError> {
        let _sent: Message = self
            .call("sendMessage", &SendMessageParams { chat_id, text })
            .await?;
        Ok(true)
    }

    async fn delete_webhook(&self, drop_pending_updates: bool) -> Result<bool, TelegramError> {
        self.call(
            "deleteWebhook",
            &DeleteWebhookParams {
                drop_pending_updates,
            },
        )
        .await
    }

    async fn get_webhook_info(&self) -> Result<WebhookInfo, TelegramError> {
        self.call("getWebhookInfo", &serde_json::json!({})).await
    }
}
