use uuid::Uuid;

use crate::domain::repository::{Clock, VerificationCodeRepository};
use crate::domain::types::CodePurpose;
use crate::error::AuthServiceError;
use crate::usecase::verification::VerificationCodeStore;

pub struct VerifyLoginInput {
    pub user_id: Uuid,
    pub code: String,
}

/// Second login factor: consume the login code or fail with a generic error.
pub struct VerifyLoginUseCase<R, C>
where
    R: VerificationCodeRepository,
    C: Clock,
{
    pub store: VerificationCodeStore<R, C>,
}

impl<R, C> VerifyLoginUseCase<R, C>
where
    R: VerificationCodeRepository,
    C: Clock,
{
    pub async fn execute(&self, input: VerifyLoginInput) -> Result<Uuid, AuthServiceError> {
        let valid = self
            .store
            .validate(input.user_id, &input.code, CodePurpose::Login)
            .await?;
        if !valid {
            return Err(AuthServiceError::InvalidCode);
        }
        Ok(input.user_id)
    }
}
