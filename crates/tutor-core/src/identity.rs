//! Gateway-injected identity headers extractor.

use axum::extract::FromRequestParts;
use http::request::Parts;
use uuid::Uuid;

use crate::error::AppError;

pub const USER_ID_HEADER: &str = "x-tutor-user-id";
pub const USER_ROLE_HEADER: &str = "x-tutor-user-role";

/// Role value granted to portal administrators.
pub const ADMIN_ROLE: u8 = 1;

/// Caller identity injected by the gateway via `x-tutor-user-id` and `x-tutor-user-role`.
///
/// Rejects with 401 if either header is absent or malformed.
#[derive(Debug, Clone)]
pub struct GatewayIdentity {
    pub user_id: Uuid,
    pub user_role: u8,
}

impl GatewayIdentity {
    pub fn require_role(&self, min_role: u8) -> Result<(), AppError> {
        if self.user_role < min_role {
            return Err(AppError::Forbidden);
        }
        Ok(())
    }
}

impl<S> FromRequestParts<S> for GatewayIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    // Values are pulled out synchronously so the returned future is 'static.
    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<Uuid>().ok());

        let user_role = parts
            .headers
            .get(USER_ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u8>().ok());

        async move {
            let user_id = user_id.ok_or(AppError::Unauthorized)?;
            let user_role = user_role.ok_or(AppError::Unauthorized)?;
            Ok(Self { user_id, user_role })
        }
    }
}
