use std::sync::Arc;

use sea_orm::DatabaseConnection;

use tutor_telegram::{BotApi, BotControl};

use crate::error::AuthServiceError;
use crate::infra::db::{DbUserRepository, DbVerificationCodeRepository};
use crate::infra::telegram::TelegramCodeDelivery;
use crate::usecase::verification::VerificationCodeStore;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    /// `None` when no bot token was configured at startup.
    pub bot: Option<Arc<dyn BotApi>>,
    pub polling: Option<Arc<dyn BotControl>>,
}

impl AppState {
    pub fn user_repo(&self) -> DbUserRepository {
        DbUserRepository {
            db: self.db.clone(),
        }
    }

    pub fn code_repo(&self) -> DbVerificationCodeRepository {
        DbVerificationCodeRepository {
            db: self.db.clone(),
        }
    }

    pub fn code_store(&self) -> VerificationCodeStore<DbVerificationCodeRepository> {
        VerificationCodeStore::new(self.code_repo())
    }

    pub fn code_delivery(&self) -> TelegramCodeDelivery {
        TelegramCodeDelivery {
            api: self.bot.clone(),
        }
    }

    pub fn bot(&self) -> Result<&Arc<dyn BotApi>, AuthServiceError> {
        self.bot.as_ref().ok_or(AuthServiceError::BotNotConfigured)
    }

    pub fn polling(&self) -> Result<&Arc<dyn BotControl>, AuthServiceError> {
        self.polling
            .as_ref()
            .ok_or(AuthServiceError::BotNotConfigured)
    }
}
