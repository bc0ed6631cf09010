use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::errors::{require_non_blank, AppError};
use crate::extractors::ApiJson;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollRequest {
    pub course_id: String,
    pub amount: f64,
    pub payment_id: String,
}

/// POST /api/v1/enrollments
pub async fn handle_enroll(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<EnrollRequest>,
) -> Result<Json<Value>, AppError> {
    require_non_blank("courseId", &req.course_id)?;
    require_non_blank("paymentId", &req.payment_id)?;
    if !req.amount.is_finite() || req.amount < 0.0 {
        return Err(AppError::Validation(
            "amount must be a non-negative number".to_string(),
        ));
    }

    let receipt = state
        .enrollment
        .enroll(user.id(), &req.course_id, req.amount, &req.payment_id)
        .await?;
    Ok(Json(json!({
        "success": true,
        "transaction": receipt.transaction,
        "user": receipt.user,
    })))
}
