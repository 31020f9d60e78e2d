use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Auth service domain error variants.
///
/// A wrong, expired or already used code is never an error inside the code
/// store; handlers turn that `false` into [`AuthServiceError::InvalidCode`]
/// with one message for every reason.
#[derive(Debug, thiserror::Error)]
pub enum AuthServiceError {
    #[error("user not found")]
    UserNotFound,
    #[error("telegram account not linked")]
    DeliveryChannelMissing,
    #[error("invalid or expired code")]
    InvalidCode,
    #[error("forbidden")]
    Forbidden,
    #[error("telegram bot not configured")]
    BotNotConfigured,
    #[error("code delivery failed")]
    DeliveryFailed,
    #[error("telegram request failed")]
    TelegramUnavailable,
    #[error("storage unavailable")]
    StorageUnavailable(#[from] anyhow::Error),
}

impl AuthServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::DeliveryChannelMissing => "DELIVERY_CHANNEL_MISSING",
            Self::InvalidCode => "INVALID_CODE",
            Self::Forbidden => "FORBIDDEN",
            Self::BotNotConfigured => "BOT_NOT_CONFIGURED",
            Self::DeliveryFailed => "DELIVERY_FAILED",
            Self::TelegramUnavailable => "TELEGRAM_UNAVAILABLE",
            Self::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
        }
    }
}

impl IntoResponse for AuthServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::DeliveryChannelMissing => StatusCode::CONFLICT,
            Self::InvalidCode => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::BotNotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            Self::DeliveryFailed | Self::TelegramUnavailable => StatusCode::BAD_GATEWAY,
            Self::StorageUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // TraceLayer records every status; only storage failures need their
        // anyhow chain logged here.
        if let Self::StorageUnavailable(ref e) = self {
            tracing::error!(error = %format!("{e:#}"), kind = "STORAGE_UNAVAILABLE", "storage error");
        }
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
