use axum::{
    Router,
    routing::{get, post},
};

use tutor_core::error::not_found;
use tutor_core::health::healthz;
use tutor_core::middleware::{propagate_request_id_layer, request_id_layer, trace_layer};

use crate::handlers::{
    admin::{force_clear, polling_status, start_polling, stop_polling, webhook_info},
    health::readyz,
    verification::{
        request_login_code, request_recovery_code, resend_login_code, resend_recovery_code,
        verify_login_code, verify_recovery_code,
    },
};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Login / 2FA
        .route("/auth/login/code", post(request_login_code))
        .route("/auth/login/code/resend", post(resend_login_code))
        .route("/auth/login/verify", post(verify_login_code))
        // Recovery
        .route("/auth/recovery/code", post(request_recovery_code))
        .route("/auth/recovery/code/resend", post(resend_recovery_code))
        .route("/auth/recovery/verify", post(verify_recovery_code))
        // Bot control
        .route("/admin/telegram/polling", get(polling_status))
        .route("/admin/telegram/polling/start", post(start_polling))
        .route("/admin/telegram/polling/stop", post(stop_polling))
        .route("/admin/telegram/polling/force-clear", post(force_clear))
        .route("/admin/telegram/webhook", get(webhook_info))
        .fallback(not_found)
        // Outermost last: the id is set before TraceLayer opens its span.
        .layer(propagate_request_id_layer())
        .layer(trace_layer())
        .layer(request_id_layer())
        .with_state(state)
}
