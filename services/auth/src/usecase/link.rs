use tracing::info;

use crate::domain::repository::UserRepository;
use crate::domain::types::PortalUser;
use crate::error::AuthServiceError;

pub struct LinkTelegramInput {
    pub link_token: String,
    pub chat_id: i64,
}

/// Bind the chat that sent `/start <token>` to the token's owner.
pub struct LinkTelegramUseCase<U>
where
    U: UserRepository,
{
    pub users: U,
}

impl<U> LinkTelegramUseCase<U>
where
    U: UserRepository,
{
    /// `Ok(None)` when no user holds the token (unknown or already used).
    pub async fn execute(
        &self,
        input: LinkTelegramInput,
    ) -> Result<Option<PortalUser>, AuthServiceError> {
        let Some(mut user) = self.users.find_by_link_token(&input.link_token).await? else {
            return Ok(None);
        };
        self.users
            .link_telegram_chat(user.id, input.chat_id)
            .await?;
        user.telegram_chat_id = Some(input.chat_id);
        info!(user_id = %user.id, chat_id = input.chat_id, "telegram account linked");
        Ok(Some(user))
    }
}
