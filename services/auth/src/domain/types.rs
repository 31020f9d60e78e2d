use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Auth-relevant user data: login identity, role, and the Telegram chat codes go to.
#[derive(Debug, Clone)]
pub struct PortalUser {
    pub id: Uuid,
    pub email: String,
    pub role: u8,
    pub telegram_chat_id: Option<i64>,
}

/// What a verification code authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodePurpose {
    Login,
    Recovery,
}

impl CodePurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Recovery => "recovery",
        }
    }
}

impl fmt::Display for CodePurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CodePurpose {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "login" => Ok(Self::Login),
            "recovery" => Ok(Self::Recovery),
            other => Err(anyhow::anyhow!("unknown code purpose: {other}")),
        }
    }
}

/// Persisted lifecycle of a code. Expiry is not stored; see [`VerificationCode::is_valid_at`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeStatus {
    Active,
    Used,
    /// Replaced by a newer code for the same user and purpose.
    Superseded,
}

impl CodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Used => "used",
            Self::Superseded => "superseded",
        }
    }
}

/// One-time numeric code bound to a user and a purpose.
#[derive(Debug, Clone)]
pub struct VerificationCode {
    pub id: Uuid,
    pub user_id: Uuid,
    pub purpose: CodePurpose,
    pub code: String,
    pub status: CodeStatus,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
}

impl VerificationCode {
    /// Active and not past `expires_at` (the boundary second still counts).
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.status == CodeStatus::Active && now <= self.expires_at
    }
}

/// Verification code length in digits.
pub const CODE_LEN: usize = 6;

/// Verification code time-to-live in seconds.
pub const CODE_TTL_SECS: i64 = 300;

/// Settings key holding the bot token when it is not provided by the environment.
pub const BOT_TOKEN_SETTING: &str = "telegram_bot_token";
