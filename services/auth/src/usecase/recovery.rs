use tracing::info;
use uuid::Uuid;

use crate::domain::repository::{Clock, VerificationCodeRepository};
use crate::domain::types::CodePurpose;
use crate::error::AuthServiceError;
use crate::usecase::verification::VerificationCodeStore;

pub struct CompleteRecoveryInput {
    pub user_id: Uuid,
    pub code: String,
}

pub struct CompleteRecoveryUseCase<R, C>
where
    R: VerificationCodeRepository,
    C: Clock,
{
    pub store: VerificationCodeStore<R, C>,
}

impl<R, C> CompleteRecoveryUseCase<R, C>
where
    R: VerificationCodeRepository,
    C: Clock,
{
    /// Consume the recovery code, then invalidate every code issued before the
    /// recovery so none of them can be replayed afterwards.
    pub async fn execute(&self, input: CompleteRecoveryInput) -> Result<Uuid, AuthServiceError> {
        let valid = self
            .store
            .validate(input.user_id, &input.code, CodePurpose::Recovery)
            .await?;
        if !valid {
            return Err(AuthServiceError::InvalidCode);
        }

        let login = self
            .store
            .mark_used(input.user_id, CodePurpose::Login)
            .await?;
        let recovery = self
            .store
            .mark_used(input.user_id, CodePurpose::Recovery)
            .await?;
        info!(
            user_id = %input.user_id,
            invalidated = login + recovery,
            "account recovery completed"
        );
        Ok(input.user_id)
    }
}
