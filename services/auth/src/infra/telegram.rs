use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use tutor_telegram::types::{Message, Update};
use tutor_telegram::{BotApi, UpdateHandler};

use crate::domain::repository::{CodeDelivery, UserRepository};
use crate::domain::types::{CODE_TTL_SECS, CodePurpose};
use crate::error::AuthServiceError;
use crate::usecase::link::{LinkTelegramInput, LinkTelegramUseCase};

const START_COMMAND: &str = "/start";

fn code_message(purpose: CodePurpose, code: &str) -> String {
    let minutes = CODE_TTL_SECS / 60;
    match purpose {
        CodePurpose::Login => {
            format!("Your login code: {code}\nIt expires in {minutes} minutes.")
        }
        CodePurpose::Recovery => format!(
            "Your account recovery code: {code}\nIt expires in {minutes} minutes. \
             Ignore this message if you did not ask to recover your account."
        ),
    }
}

/// Delivers codes with `sendMessage`. Without a bot token every delivery
/// fails with [`AuthServiceError::BotNotConfigured`].
#[derive(Clone)]
pub struct TelegramCodeDelivery {
    pub api: Option<Arc<dyn BotApi>>,
}

impl CodeDelivery for TelegramCodeDelivery {
    async fn deliver(
        &self,
        chat_id: i64,
        purpose: CodePurpose,
        code: &str,
    ) -> Result<(), AuthServiceError> {
        let api = self.api.as_ref().ok_or(AuthServiceError::BotNotConfigured)?;
        match api.send_message(chat_id, &code_message(purpose, code)).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(AuthServiceError::DeliveryFailed),
            Err(e) => {
                warn!(chat_id, %purpose, error = %e, "sendMessage failed");
                Err(AuthServiceError::DeliveryFailed)
            }
        }
    }
}

/// Extract the link token from a private `/start <token>` message.
fn link_token(message: &Message) -> Option<&str> {
    if !message.chat.is_private() {
        return None;
    }
    let text = message.text.as_deref()?.trim();
    let rest = text.strip_prefix(START_COMMAND)?;
    // Deep links arrive as "/start <payload>"; "/startx" is another command.
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let token = rest.trim();
    (!token.is_empty()).then_some(token)
}

/// Dispatch target of the poll loop: resolves pending account-linking requests.
pub struct LinkAccountHandler<U>
where
    U: UserRepository,
{
    linking: LinkTelegramUseCase<U>,
    api: Arc<dyn BotApi>,
}

impl<U> LinkAccountHandler<U>
where
    U: UserRepository,
{
    pub fn new(users: U, api: Arc<dyn BotApi>) -> Self {
        Self {
            linking: LinkTelegramUseCase { users },
            api,
        }
    }
}

#[async_trait]
impl<U> UpdateHandler for LinkAccountHandler<U>
where
    U: UserRepository + 'static,
{
    async fn handle(&self, update: Update) -> anyhow::Result<()> {
        let Some(message) = update.message else {
            return Ok(());
        };
        let Some(token) = link_token(&message) else {
            debug!(update_id = update.update_id, "ignoring update");
            return Ok(());
        };

        let chat_id = message.chat.id;
        let linked = self
            .linking
            .execute(LinkTelegramInput {
                link_token: token.to_owned(),
                chat_id,
            })
            .await?;

        let reply = match linked {
            Some(user) => format!(
                "Telegram is now linked to {}. Login codes will arrive here.",
                user.email
            ),
            None => "This link has expired. Open the portal and generate a new one.".to_owned(),
        };
        self.api.send_message(chat_id, &reply).await?;
        Ok(())
    }
}
