use axum::Json;
use axum::http::StatusCode;
use serde_json::{Map, Value};

/// Handler for `GET /healthz`: liveness only, never touches dependencies.
pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Build a readiness response from named dependency checks.
///
/// Answers 200 when every check passed, 503 otherwise. The body lists each check
/// as `"ok"` or `"down"` so operators can tell which dependency is missing.
pub fn readiness(checks: &[(&str, bool)]) -> (StatusCode, Json<Value>) {
    let mut body = Map::new();
    for (name, ok) in checks {
        body.insert(
            (*name).to_owned(),
            Value::from(if *ok { "ok" } else { "down" }),
        );
    }
    let status = if checks.iter().all(|(_, ok)| *ok) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(Value::Object(body)))
}
