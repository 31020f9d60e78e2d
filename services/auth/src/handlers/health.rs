use axum::{Json, extract::State, http::StatusCode};
use serde_json::Value;

use tutor_core::health::readiness;

use crate::state::AppState;

/// Handler for `GET /readyz`: the database must answer a ping.
///
/// The bot is reported but never fails readiness; a portal without a token
/// still serves everything except code delivery.
pub async fn readyz(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let database = state.db.ping().await.is_ok();
    let (status, Json(mut body)) = readiness(&[("database", database)]);
    body["telegram"] = Value::from(if state.bot.is_some() {
        "configured"
    } else {
        "disabled"
    });
    (status, Json(body))
}
