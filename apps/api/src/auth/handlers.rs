use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::{require_non_blank, AppError};
use crate::extractors::ApiJson;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct VerifyRequest {
    pub email: String,
    pub code: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /api/v1/auth/register
pub async fn handle_register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<Json<Value>, AppError> {
    require_non_blank("name", &req.name)?;
    require_non_blank("email", &req.email)?;
    require_non_blank("password", &req.password)?;

    state
        .registration
        .request_registration(&req.name, &req.email, &req.password)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "A verification code has been sent to your email."
    })))
}

/// POST /api/v1/auth/verify
pub async fn handle_verify(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<VerifyRequest>,
) -> Result<Json<Value>, AppError> {
    require_non_blank("email", &req.email)?;
    require_non_blank("code", &req.code)?;

    let session = state
        .registration
        .verify_registration(&req.email, &req.code)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Account verified successfully.",
        "token": session.token,
        "user": session.user,
    })))
}

/// POST /api/v1/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    require_non_blank("email", &req.email)?;
    require_non_blank("password", &req.password)?;

    let session = state.registration.login(&req.email, &req.password).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Login successful.",
        "token": session.token,
        "user": session.user,
    })))
}
