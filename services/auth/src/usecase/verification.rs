use chrono::Duration;
use rand::RngExt;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::repository::{Clock, SystemClock, VerificationCodeRepository};
use crate::domain::types::{CODE_LEN, CODE_TTL_SECS, CodePurpose, CodeStatus, VerificationCode};
use crate::error::AuthServiceError;

/// Uniform over `000000..=999999`, drawn from the thread-local CSPRNG.
fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LEN)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

fn is_well_formed(code: &str) -> bool {
    code.len() == CODE_LEN && code.bytes().all(|b| b.is_ascii_digit())
}

/// Issues, validates and invalidates one-time codes.
///
/// At most one code per (user, purpose) is active: issuing supersedes the
/// previous one. Validation fails closed and consumes the code with a single
/// conditional update, so concurrent callers see exactly one success.
pub struct VerificationCodeStore<R, C = SystemClock>
where
    R: VerificationCodeRepository,
    C: Clock,
{
    pub codes: R,
    pub clock: C,
}

impl<R> VerificationCodeStore<R, SystemClock>
where
    R: VerificationCodeRepository,
{
    pub fn new(codes: R) -> Self {
        Self {
            codes,
            clock: SystemClock,
        }
    }
}

impl<R, C> VerificationCodeStore<R, C>
where
    R: VerificationCodeRepository,
    C: Clock,
{
    /// Store a fresh active code and return its plaintext for delivery.
    pub async fn issue(
        &self,
        user_id: Uuid,
        purpose: CodePurpose,
    ) -> Result<String, AuthServiceError> {
        let now = self.clock.now();
        let record = VerificationCode {
            id: Uuid::new_v4(),
            user_id,
            purpose,
            code: generate_code(),
            status: CodeStatus::Active,
            issued_at: now,
            expires_at: now + Duration::seconds(CODE_TTL_SECS),
            used_at: None,
        };
        self.codes.supersede_and_insert(&record).await?;
        info!(%user_id, %purpose, code_id = %record.id, "verification code issued");
        Ok(record.code)
    }

    /// Caller-facing reissue; supersedes exactly like [`Self::issue`].
    pub async fn resend(
        &self,
        user_id: Uuid,
        purpose: CodePurpose,
    ) -> Result<String, AuthServiceError> {
        debug!(%user_id, %purpose, "verification code resend requested");
        self.issue(user_id, purpose).await
    }

    /// `Ok(false)` for a wrong, expired, used, superseded or other-purpose code.
    /// Errors only when storage is unreachable.
    pub async fn validate(
        &self,
        user_id: Uuid,
        code: &str,
        purpose: CodePurpose,
    ) -> Result<bool, AuthServiceError> {
        if !is_well_formed(code) {
            return Ok(false);
        }
        let consumed = self
            .codes
            .consume(user_id, purpose, code, self.clock.now())
            .await?;
        if consumed {
            info!(%user_id, %purpose, "verification code consumed");
        } else {
            debug!(%user_id, %purpose, "verification code rejected");
        }
        Ok(consumed)
    }

    /// Invalidate any active code for (user, purpose) without checking it.
    pub async fn mark_used(
        &self,
        user_id: Uuid,
        purpose: CodePurpose,
    ) -> Result<u64, AuthServiceError> {
        let changed = self
            .codes
            .invalidate(user_id, purpose, self.clock.now())
            .await?;
        debug!(%user_id, %purpose, changed, "active verification codes invalidated");
        Ok(changed)
    }
}
