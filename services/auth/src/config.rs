use crate::domain::repository::SettingsRepository;
use crate::domain::types::BOT_TOKEN_SETTING;
use crate::error::AuthServiceError;

/// Auth service configuration loaded from environment variables.
#[derive(Debug)]
pub struct AuthConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// TCP port to listen on (default 3112). Env var: `AUTH_PORT`.
    pub auth_port: u16,
    /// Bot token override. Env var: `TELEGRAM_BOT_TOKEN`; falls back to the
    /// `telegram_bot_token` settings row.
    pub telegram_bot_token: Option<String>,
    /// Bot API base URL. Env var: `TELEGRAM_API_BASE`.
    pub telegram_api_base: String,
    /// Long-poll timeout passed to `getUpdates` (default 1). Env var: `TELEGRAM_POLL_TIMEOUT_SECS`.
    pub telegram_poll_timeout_secs: u64,
    /// Start polling right after boot. Env var: `TELEGRAM_AUTOSTART`.
    pub telegram_autostart: bool,
}

impl AuthConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL").expect("DATABASE_URL"),
            auth_port: std::env::var("AUTH_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3112),
            telegram_bot_token: std::env::var("TELEGRAM_BOT_TOKEN").ok(),
            telegram_api_base: std::env::var("TELEGRAM_API_BASE")
                .unwrap_or_else(|_| tutor_telegram::client::DEFAULT_API_BASE.to_owned()),
            telegram_poll_timeout_secs: std::env::var("TELEGRAM_POLL_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1),
            telegram_autostart: std::env::var("TELEGRAM_AUTOSTART")
                .ok()
                .is_some_and(|v| parse_flag(&v)),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Resolve the bot token once at startup: environment first, then settings.
///
/// `Ok(None)` means bot features stay disabled for this process.
pub async fn resolve_bot_token<S>(
    env_token: Option<String>,
    settings: &S,
) -> Result<Option<String>, AuthServiceError>
where
    S: SettingsRepository,
{
    if let Some(token) = non_blank(env_token) {
        return Ok(Some(token));
    }
    Ok(non_blank(settings.get(BOT_TOKEN_SETTING).await?))
}
