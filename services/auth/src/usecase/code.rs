use tracing::warn;
use uuid::Uuid;

use crate::domain::repository::{Clock, CodeDelivery, UserRepository, VerificationCodeRepository};
use crate::domain::types::{CODE_TTL_SECS, CodePurpose, PortalUser};
use crate::error::AuthServiceError;
use crate::usecase::verification::VerificationCodeStore;

/// Result of issuing a code; the code itself only travels over Telegram.
#[derive(Debug, Clone)]
pub struct IssuedCode {
    pub user_id: Uuid,
    pub expires_in: i64,
}

fn delivery_target(user: &PortalUser) -> Result<i64, AuthServiceError> {
    user.telegram_chat_id
        .ok_or(AuthServiceError::DeliveryChannelMissing)
}

async fn deliver<D: CodeDelivery>(
    delivery: &D,
    user: &PortalUser,
    chat_id: i64,
    purpose: CodePurpose,
    code: &str,
) -> Result<IssuedCode, AuthServiceError> {
    if let Err(e) = delivery.deliver(chat_id, purpose, code).await {
        // The stored code stays active; the user can ask for a resend.
        warn!(user_id = %user.id, %purpose, error = %e, "verification code not delivered");
        return Err(e);
    }
    Ok(IssuedCode {
        user_id: user.id,
        expires_in: CODE_TTL_SECS,
    })
}

pub struct RequestCodeInput {
    pub email: String,
    pub purpose: CodePurpose,
}

/// Login and recovery entry point: look the user up by email, issue, deliver.
pub struct RequestCodeUseCase<U, R, D, C>
where
    U: UserRepository,
    R: VerificationCodeRepository,
    D: CodeDelivery,
    C: Clock,
{
    pub users: U,
    pub store: VerificationCodeStore<R, C>,
    pub delivery: D,
}

impl<U, R, D, C> RequestCodeUseCase<U, R, D, C>
where
    U: UserRepository,
    R: VerificationCodeRepository,
    D: CodeDelivery,
    C: Clock,
{
    pub async fn execute(&self, input: RequestCodeInput) -> Result<IssuedCode, AuthServiceError> {
        // 1. Find user by email → 404 if not found
        let user = self
            .users
            .find_by_email(&input.email)
            .await?
            .ok_or(AuthServiceError::UserNotFound)?;

        // 2. Require a linked Telegram chat before a code exists at all
        let chat_id = delivery_target(&user)?;

        // 3. Issue (supersedes any active code) and deliver
        let code = self.store.issue(user.id, input.purpose).await?;
        deliver(&self.delivery, &user, chat_id, input.purpose, &code).await
    }
}

pub struct ResendCodeInput {
    pub user_id: Uuid,
    pub purpose: CodePurpose,
}

pub struct ResendCodeUseCase<U, R, D, C>
where
    U: UserRepository,
    R: VerificationCodeRepository,
    D: CodeDelivery,
    C: Clock,
{
    pub users: U,
    pub store: VerificationCodeStore<R, C>,
    pub delivery: D,
}

impl<U, R, D, C> ResendCodeUseCase<U, R, D, C>
where
    U: UserRepository,
    R: VerificationCodeRepository,
    D: CodeDelivery,
    C: Clock,
{
    pub async fn execute(&self, input: ResendCodeInput) -> Result<IssuedCode, AuthServiceError> {
        let user = self
            .users
            .find_by_id(input.user_id)
            .await?
            .ok_or(AuthServiceError::UserNotFound)?;
        let chat_id = delivery_target(&user)?;
        let code = self.store.resend(user.id, input.purpose).await?;
        deliver(&self.delivery, &user, chat_id, input.purpose, &code).await
    }
}
