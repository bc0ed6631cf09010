use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::errors::{require_non_blank, AppError};
use crate::extractors::{ApiJson, ApiPath, ApiQuery};
use crate::models::course::{CourseFilters, NewCourse};
use crate::state::AppState;

/// GET /api/v1/courses?search=&tag=&price=
pub async fn handle_list_courses(
    State(state): State<AppState>,
    ApiQuery(filters): ApiQuery<CourseFilters>,
) -> Result<Json<Value>, AppError> {
    let courses = state.store.list_courses(&filters).await?;
    Ok(Json(json!({ "success": true, "courses": courses })))
}

/// GET /api/v1/courses/:id
pub async fn handle_get_course(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<Value>, AppError> {
    let course = state
        .store
        .course_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Course {id} not found")))?;
    Ok(Json(json!({ "success": true, "course": course })))
}

/// POST /api/v1/courses (admin only)
pub async fn handle_add_course(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(new): ApiJson<NewCourse>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    user.require_admin()?;
    require_non_blank("title", &new.title)?;
    require_non_blank("description", &new.description)?;
    require_non_blank("instructor", &new.instructor)?;
    if !new.price.is_finite() || new.price < 0.0 {
        return Err(AppError::Validation(
            "price must be a non-negative number".to_string(),
        ));
    }

    let course = state.store.add_course(new).await?;
    tracing::info!(course_id = %course.id, "course added");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "course": course })),
    ))
}

/// GET /api/v1/tags
pub async fn handle_list_tags(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let tags = state.store.list_tags().await?;
    Ok(Json(json!({ "success": true, "tags": tags })))
}

/// GET /api/v1/resources
pub async fn handle_list_resources(
    State(state): State<AppState>,
) -> Result<Json<Value>, AppError> {
    let resources = state.store.list_resources().await?;
    Ok(Json(json!({ "success": true, "resources": resources })))
}

/// GET /api/v1/problems
pub async fn handle_list_problems(
    State(state): State<AppState>,
) -> Result<Json<Value>, AppError> {
    let problems = state.store.list_problems().await?;
    Ok(Json(json!({ "success": true, "problems": problems })))
}

/// GET /api/v1/leaderboard
pub async fn handle_leaderboard(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let leaderboard = state.store.leaderboard().await?;
    Ok(Json(json!({ "success": true, "leaderboard": leaderboard })))
}
