//! Ports used by the use cases. Futures are declared `Send` so use cases can
//! run inside axum handlers and the Telegram update handler alike.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::types::{CodePurpose, PortalUser, VerificationCode};
use crate::error::AuthServiceError;

/// Port for looking up portal users and their Telegram link.
pub trait UserRepository: Send + Sync {
    fn find_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<PortalUser>, AuthServiceError>> + Send;

    fn find_by_id(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<PortalUser>, AuthServiceError>> + Send;

    fn find_by_link_token(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<Option<PortalUser>, AuthServiceError>> + Send;

    /// Bind a Telegram chat to the user and clear the one-shot link token.
    fn link_telegram_chat(
        &self,
        user_id: Uuid,
        chat_id: i64,
    ) -> impl Future<Output = Result<(), AuthServiceError>> + Send;
}

/// Repository for one-time verification codes.
pub trait VerificationCodeRepository: Send + Sync {
    /// Mark every active code for (user, purpose) superseded and insert `code`,
    /// atomically (same transaction).
    fn supersede_and_insert(
        &self,
        code: &VerificationCode,
    ) -> impl Future<Output = Result<(), AuthServiceError>> + Send;

    /// Single conditional update: active + matching + unexpired → used.
    /// Returns `true` only for the caller whose update affected the row.
    fn consume(
        &self,
        user_id: Uuid,
        purpose: CodePurpose,
        code: &str,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool, AuthServiceError>> + Send;

    /// Mark every active code for (user, purpose) used. Returns how many changed.
    fn invalidate(
        &self,
        user_id: Uuid,
        purpose: CodePurpose,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<u64, AuthServiceError>> + Send;
}

/// Read access to admin-editable settings.
pub trait SettingsRepository: Send + Sync {
    fn get(&self, key: &str)
    -> impl Future<Output = Result<Option<String>, AuthServiceError>> + Send;
}

/// Channel that carries a plaintext code to the user.
pub trait CodeDelivery: Send + Sync {
    fn deliver(
        &self,
        chat_id: i64,
        purpose: CodePurpose,
        code: &str,
    ) -> impl Future<Output = Result<(), AuthServiceError>> + Send;
}

/// Source of "now", injectable so expiry can be tested.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
