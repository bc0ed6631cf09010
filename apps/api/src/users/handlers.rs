use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::extractors::{ApiJson, ApiPath};
use crate::models::user::{ExternalAccount, Platform, UserPatch};
use crate::state::AppState;
use crate::users::MAX_SOLVED_COUNT;

/// Profile fields a user may change about themselves.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub external_accounts: Option<Vec<ExternalAccount>>,
}

/// GET /api/v1/users/me
///
/// A valid token whose user no longer exists is treated as unauthenticated.
pub async fn handle_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Value>, AppError> {
    let found = state
        .store
        .find_by_id(user.id())
        .await?
        .ok_or(AppError::Unauthorized)?;
    Ok(Json(json!({ "success": true, "user": found.to_public() })))
}

/// PATCH /api/v1/users/me
pub async fn handle_update_me(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> Result<Json<Value>, AppError> {
    if update.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(AppError::Validation("name must not be blank".to_string()));
    }
    if let Some(accounts) = &update.external_accounts {
        check_accounts(accounts)?;
    }

    let patch = UserPatch {
        name: update.name.map(|n| n.trim().to_string()),
        external_accounts: update.external_accounts,
        is_verified: None,
    };
    let updated = state
        .store
        .mutate(user.id(), patch)
        .await?
        .ok_or(AppError::Unauthorized)?;
    Ok(Json(json!({ "success": true, "user": updated.to_public() })))
}

fn check_accounts(accounts: &[ExternalAccount]) -> Result<(), AppError> {
    for account in accounts {
        if account.stats.solved_count > MAX_SOLVED_COUNT {
            return Err(AppError::Validation(format!(
                "solvedCount must be at most {MAX_SOLVED_COUNT}"
            )));
        }
        if account.username.trim().is_empty() {
            return Err(AppError::Validation("username is required".to_string()));
        }
    }
    Ok(())
}

/// POST /api/v1/users/me/accounts/:platform/sync
pub async fn handle_sync_account(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(platform): ApiPath<Platform>,
) -> Result<Json<Value>, AppError> {
    let account = state.accounts.sync(user.id(), platform).await?;
    Ok(Json(json!({ "success": true, "account": account })))
}

/// GET /api/v1/users/me/transactions
pub async fn handle_my_transactions(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Value>, AppError> {
    let transactions = state.store.transactions_for_user(user.id()).await?;
    Ok(Json(json!({ "success": true, "transactions": transactions })))
}
