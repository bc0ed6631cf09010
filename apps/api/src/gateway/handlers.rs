use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::errors::{require_non_blank, AppError};
use crate::extractors::ApiJson;
use crate::gateway::models::{CareerQuizAnswers, ResumeData};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RoadmapRequest {
    pub topic: String,
}

#[derive(Deserialize)]
pub struct TrendsRequest {
    pub career: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HintRequest {
    pub problem_title: String,
}

#[derive(Deserialize)]
pub struct JobsRequest {
    pub role: String,
    pub skills: String,
}

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Deserialize)]
pub struct SpeechRequest {
    pub text: String,
}

/// POST /api/v1/ai/roadmap
pub async fn handle_roadmap(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiJson(req): ApiJson<RoadmapRequest>,
) -> Result<Json<Value>, AppError> {
    require_non_blank("topic", &req.topic)?;
    let roadmap = state.gateway.generate_roadmap(req.topic.trim()).await?;
    Ok(Json(json!({ "success": true, "roadmap": roadmap })))
}

/// POST /api/v1/ai/career-path
pub async fn handle_career_path(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiJson(answers): ApiJson<CareerQuizAnswers>,
) -> Result<Json<Value>, AppError> {
    require_non_blank("interests", &answers.interests)?;
    require_non_blank("activities", &answers.activities)?;
    require_non_blank("learningStyle", &answers.learning_style)?;
    require_non_blank("goal", &answers.goal)?;
    let path = state.gateway.recommend_career_path(&answers).await?;
    Ok(Json(json!({ "success": true, "careerPath": path })))
}

/// POST /api/v1/ai/resume
pub async fn handle_resume(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiJson(data): ApiJson<ResumeData>,
) -> Result<Json<Value>, AppError> {
    require_non_blank("name", &data.name)?;
    require_non_blank("email", &data.email)?;
    let resume = state.gateway.generate_resume(&data).await?;
    Ok(Json(json!({ "success": true, "resume": resume })))
}

/// POST /api/v1/ai/trends
pub async fn handle_trends(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiJson(req): ApiJson<TrendsRequest>,
) -> Result<Json<Value>, AppError> {
    require_non_blank("career", &req.career)?;
    let report = state.gateway.get_future_trends(req.career.trim()).await?;
    Ok(Json(json!({
        "success": true,
        "text": report.text,
        "sources": report.sources,
    })))
}

/// POST /api/v1/ai/hint
pub async fn handle_hint(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiJson(req): ApiJson<HintRequest>,
) -> Result<Json<Value>, AppError> {
    require_non_blank("problemTitle", &req.problem_title)?;
    let hint = state.gateway.get_hint(req.problem_title.trim()).await?;
    Ok(Json(json!({ "success": true, "hint": hint })))
}

/// POST /api/v1/ai/jobs
pub async fn handle_jobs(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiJson(req): ApiJson<JobsRequest>,
) -> Result<Json<Value>, AppError> {
    require_non_blank("role", &req.role)?;
    require_non_blank("skills", &req.skills)?;
    let result = state
        .gateway
        .find_jobs(req.role.trim(), req.skills.trim())
        .await?;
    Ok(Json(json!({
        "success": true,
        "jobs": result.jobs,
        "sources": result.sources,
    })))
}

/// POST /api/v1/ai/chat
pub async fn handle_chat(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<ChatRequest>,
) -> Result<Json<Value>, AppError> {
    require_non_blank("message", &req.message)?;
    let reply = state.gateway.continue_chat(user.id(), &req.message).await?;
    Ok(Json(json!({ "success": true, "reply": reply })))
}

/// POST /api/v1/ai/speech
///
/// Always succeeds once authenticated; `audio` is null when speech is
/// unavailable.
pub async fn handle_speech(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiJson(req): ApiJson<SpeechRequest>,
) -> Result<Json<Value>, AppError> {
    require_non_blank("text", &req.text)?;
    let audio = state.gateway.generate_speech(&req.text).await;
    Ok(Json(json!({ "success": true, "audio": audio })))
}
