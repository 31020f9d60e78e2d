/// Bot API error code Telegram uses when another consumer holds `getUpdates`
/// (or a webhook is registered while polling).
pub const CONFLICT_ERROR_CODE: i64 = 409;

#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error("telegram request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("telegram conflict: {description}")]
    Conflict { description: String },
    #[error("telegram api error {code}: {description}")]
    Api { code: i64, description: String },
    #[error("unexpected telegram response: {0}")]
    Decode(String),
}

impl TelegramError {
    /// Build the error for a non-ok Bot API response, classified by `error_code`.
    pub fn from_api(code: Option<i64>, description: Option<String>) -> Self {
        let description = description.unwrap_or_else(|| "telegram returned ok=false".to_owned());
        match code {
            Some(CONFLICT_ERROR_CODE) => Self::Conflict { description },
            code => Self::Api {
                code: code.unwrap_or_default(),
                description,
            },
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
