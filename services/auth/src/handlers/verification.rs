use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::types::CodePurpose;
use crate::error::AuthServiceError;
use crate::state::AppState;
use crate::usecase::code::{
    IssuedCode, RequestCodeInput, RequestCodeUseCase, ResendCodeInput, ResendCodeUseCase,
};
use crate::usecase::login::{VerifyLoginInput, VerifyLoginUseCase};
use crate::usecase::recovery::{CompleteRecoveryInput, CompleteRecoveryUseCase};

#[derive(Deserialize)]
pub struct RequestCodeRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResendCodeRequest {
    pub user_id: Uuid,
}

#[derive(Deserialize)]
pub struct VerifyCodeRequest {
    pub user_id: Uuid,
    pub code: String,
}

#[derive(Serialize)]
pub struct IssuedCodeResponse {
    pub user_id: Uuid,
    pub expires_in: i64,
}

impl From<IssuedCode> for IssuedCodeResponse {
    fn from(issued: IssuedCode) -> Self {
        Self {
            user_id: issued.user_id,
            expires_in: issued.expires_in,
        }
    }
}

#[derive(Serialize)]
pub struct VerifiedResponse {
    pub user_id: Uuid,
    pub verified: bool,
}

async fn request_code(
    state: &AppState,
    email: String,
    purpose: CodePurpose,
) -> Result<(StatusCode, Json<IssuedCodeResponse>), AuthServiceError> {
    let usecase = RequestCodeUseCase {
        users: state.user_repo(),
        store: state.code_store(),
        delivery: state.code_delivery(),
    };
    let issued = usecase.execute(RequestCodeInput { email, purpose }).await?;
    Ok((StatusCode::CREATED, Json(issued.into())))
}

async fn resend_code(
    state: &AppState,
    user_id: Uuid,
    purpose: CodePurpose,
) -> Result<(StatusCode, Json<IssuedCodeResponse>), AuthServiceError> {
    let usecase = ResendCodeUseCase {
        users: state.user_repo(),
        store: state.code_store(),
        delivery: state.code_delivery(),
    };
    let issued = usecase.execute(ResendCodeInput { user_id, purpose }).await?;
    Ok((StatusCode::CREATED, Json(issued.into())))
}

// ── Login ─────────────────────────────────────────────────────────────────────

pub async fn request_login_code(
    State(state): State<AppState>,
    Json(body): Json<RequestCodeRequest>,
) -> Result<(StatusCode, Json<IssuedCodeResponse>), AuthServiceError> {
    request_code(&state, body.email, CodePurpose::Login).await
}

pub async fn resend_login_code(
    State(state): State<AppState>,
    Json(body): Json<ResendCodeRequest>,
) -> Result<(StatusCode, Json<IssuedCodeResponse>), AuthServiceError> {
    resend_code(&state, body.user_id, CodePurpose::Login).await
}

pub async fn verify_login_code(
    State(state): State<AppState>,
    Json(body): Json<VerifyCodeRequest>,
) -> Result<Json<VerifiedResponse>, AuthServiceError> {
    let usecase = VerifyLoginUseCase {
        store: state.code_store(),
    };
    let user_id = usecase
        .execute(VerifyLoginInput {
            user_id: body.user_id,
            code: body.code,
        })
        .await?;
    Ok(Json(VerifiedResponse {
        user_id,
        verified: true,
    }))
}

// ── Recovery ──────────────────────────────────────────────────────────────────

pub async fn request_recovery_code(
    State(state): State<AppState>,
    Json(body): Json<RequestCodeRequest>,
) -> Result<(StatusCode, Json<IssuedCodeResponse>), AuthServiceError> {
    request_code(&state, body.email, CodePurpose::Recovery).await
}

pub async fn resend_recovery_code(
    State(state): State<AppState>,
    Json(body): Json<ResendCodeRequest>,
) -> Result<(StatusCode, Json<IssuedCodeResponse>), AuthServiceError> {
    resend_code(&state, body.user_id, CodePurpose::Recovery).await
}

pub async fn verify_recovery_code(
    State(state): State<AppState>,
    Json(body): Json<VerifyCodeRequest>,
) -> Result<Json<VerifiedResponse>, AuthServiceError> {
    let usecase = CompleteRecoveryUseCase {
        store: state.code_store(),
    };
    let user_id = usecase
        .execute(CompleteRecoveryInput {
            user_id: body.user_id,
            code: body.code,
        })
        .await?;
    Ok(Json(VerifiedResponse {
        user_id,
        verified: true,
    }))
}
