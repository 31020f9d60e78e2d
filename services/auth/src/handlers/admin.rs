//! Operator surface for the Telegram bot. Every route needs the admin role.

use axum::{Json, extract::State};
use tracing::{info, warn};

use tutor_core::identity::{ADMIN_ROLE, GatewayIdentity};
use tutor_telegram::{ClearReport, PollingStatus};
use tutor_telegram::types::WebhookInfo;

use crate::error::AuthServiceError;
use crate::state::AppState;

fn require_admin(identity: &GatewayIdentity) -> Result<(), AuthServiceError> {
    identity
        .require_role(ADMIN_ROLE)
        .map_err(|_| AuthServiceError::Forbidden)
}

// ── GET /admin/telegram/polling ───────────────────────────────────────────────

pub async fn polling_status(
    identity: GatewayIdentity,
    State(state): State<AppState>,
) -> Result<Json<PollingStatus>, AuthServiceError> {
    require_admin(&identity)?;
    Ok(Json(state.polling()?.status()))
}

// ── POST /admin/telegram/polling/start ────────────────────────────────────────

pub async fn start_polling(
    identity: GatewayIdentity,
    State(state): State<AppState>,
) -> Result<Json<PollingStatus>, AuthServiceError> {
    require_admin(&identity)?;
    let status = state.polling()?.start();
    info!(admin_id = %identity.user_id, offset = status.offset, "polling start requested");
    Ok(Json(status))
}

// ── POST /admin/telegram/polling/stop ─────────────────────────────────────────

pub async fn stop_polling(
    identity: GatewayIdentity,
    State(state): State<AppState>,
) -> Result<Json<PollingStatus>, AuthServiceError> {
    require_admin(&identity)?;
    let status = state.polling()?.stop();
    info!(admin_id = %identity.user_id, offset = status.offset, "polling stop requested");
    Ok(Json(status))
}

// ── POST /admin/telegram/polling/force-clear ──────────────────────────────────

pub async fn force_clear(
    identity: GatewayIdentity,
    State(state): State<AppState>,
) -> Result<Json<ClearReport>, AuthServiceError> {
    require_admin(&identity)?;
    let polling = state.polling()?;
    info!(admin_id = %identity.user_id, "force clear requested");
    Ok(Json(polling.force_clear().await))
}

// ── GET /admin/telegram/webhook ───────────────────────────────────────────────

pub async fn webhook_info(
    identity: GatewayIdentity,
    State(state): State<AppState>,
) -> Result<Json<WebhookInfo>, AuthServiceError> {
    require_admin(&identity)?;
    let info = state.bot()?.get_webhook_info().await.map_err(|e| {
        warn!(error = %e, "getWebhookInfo failed");
        AuthServiceError::TelegramUnavailable
    })?;
    Ok(Json(info))
}
