//! AI Gateway. Turns typed requests into model calls and model output back
//! into typed, validated results.
//!
//! Every call is bounded by a timeout and never retried. Transport failures
//! of any kind collapse into `GatewayError::Unavailable`; the provider detail
//! is logged here and goes no further.

pub mod conversation;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod prompts;
pub mod schemas;

#[cfg(test)]
pub mod fake;

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::gateway::conversation::ConversationRegistry;
use crate::gateway::extract::{embedded_json_array, grounding_sources};
use crate::gateway::models::{
    CareerPath, CareerQuizAnswers, JobPosting, JobSearchResult, LearningRoadmap, ResumeData,
    TrendsReport,
};
use crate::gateway::schemas::{career_path_schema, roadmap_schema, Validate};
use crate::llm_client::{
    strip_json_fences, InvokeOptions, LlmError, ModelBackend, ModelResponse, ModelTier,
    ResponseMode, Turn, REASONING_THINKING_BUDGET, SPEECH_VOICE,
};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("model response did not match the expected schema: {0}")]
    SchemaViolation(String),

    #[error("model response had no parsable JSON array: {0}")]
    UnparsableEmbeddedJson(String),

    #[error("model unavailable: {0}")]
    Unavailable(#[source] LlmError),
}

pub struct AiGateway {
    backend: Arc<dyn ModelBackend>,
    conversations: ConversationRegistry,
    timeout: Duration,
}

impl AiGateway {
    pub fn new(
        backend: Arc<dyn ModelBackend>,
        conversations: ConversationRegistry,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            conversations,
            timeout,
        }
    }

    async fn call(
        &self,
        tier: ModelTier,
        turns: &[Turn],
        options: &InvokeOptions,
    ) -> Result<ModelResponse, GatewayError> {
        let outcome = tokio::time::timeout(self.timeout, self.backend.invoke(tier, turns, options)).await;
        match outcome {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => {
                error!(model = tier.model(), error = %e, "model call failed");
                Err(GatewayError::Unavailable(e))
            }
            Err(_) => {
                error!(model = tier.model(), timeout = ?self.timeout, "model call timed out");
                Err(GatewayError::Unavailable(LlmError::Timeout(self.timeout)))
            }
        }
    }

    async fn call_text(
        &self,
        tier: ModelTier,
        turns: &[Turn],
        options: &InvokeOptions,
    ) -> Result<String, GatewayError> {
        let response = self.call(tier, turns, options).await?;
        response.text.ok_or_else(|| {
            error!(model = tier.model(), "model returned no text");
            GatewayError::Unavailable(LlmError::EmptyContent)
        })
    }

    /// Schema-constrained call on the reasoning tier, parsed and validated.
    async fn call_structured<T>(&self, prompt: String, schema: serde_json::Value) -> Result<T, GatewayError>
    where
        T: DeserializeOwned + Validate,
    {
        let options = InvokeOptions {
            mode: ResponseMode::Json { schema },
            thinking_budget: Some(REASONING_THINKING_BUDGET),
            ..Default::default()
        };
        let response = self
            .call(ModelTier::Reasoning, &[Turn::user(prompt)], &options)
            .await?;
        let text = response
            .text
            .ok_or_else(|| GatewayError::SchemaViolation("empty response".to_string()))?;
        let value: T = serde_json::from_str(strip_json_fences(&text))
            .map_err(|e| GatewayError::SchemaViolation(e.to_string()))?;
        value.validate().map_err(GatewayError::SchemaViolation)?;
        Ok(value)
    }

    pub async fn generate_roadmap(&self, topic: &str) -> Result<LearningRoadmap, GatewayError> {
        self.call_structured(prompts::roadmap(topic), roadmap_schema())
            .await
    }

    pub async fn recommend_career_path(
        &self,
        answers: &CareerQuizAnswers,
    ) -> Result<CareerPath, GatewayError> {
        self.call_structured(prompts::career_path(answers), career_path_schema())
            .await
    }

    pub async fn generate_resume(&self, data: &ResumeData) -> Result<String, GatewayError> {
        self.call_text(
            ModelTier::Reasoning,
            &[Turn::user(prompts::resume(data))],
            &InvokeOptions::default(),
        )
        .await
    }

    pub async fn get_future_trends(&self, career: &str) -> Result<TrendsReport, GatewayError> {
        let options = InvokeOptions {
            search_grounding: true,
            ..Default::default()
        };
        let response = self
            .call(
                ModelTier::Fast,
                &[Turn::user(prompts::future_trends(career))],
                &options,
            )
            .await?;
        let text = response
            .text
            .ok_or(GatewayError::Unavailable(LlmError::EmptyContent))?;
        Ok(TrendsReport {
            text,
            sources: grounding_sources(response.grounding_chunks),
        })
    }

    pub async fn get_hint(&self, problem_title: &str) -> Result<String, GatewayError> {
        self.call_text(
            ModelTier::Fast,
            &[Turn::user(prompts::dsa_hint(problem_title))],
            &InvokeOptions::default(),
        )
        .await
    }

    pub async fn find_jobs(&self, role: &str, skills: &str) -> Result<JobSearchResult, GatewayError> {
        let options = InvokeOptions {
            search_grounding: true,
            thinking_budget: Some(REASONING_THINKING_BUDGET),
            ..Default::default()
        };
        let response = self
            .call(
                ModelTier::Reasoning,
                &[Turn::user(prompts::job_search(role, skills))],
                &options,
            )
            .await?;

        let text = response.text.unwrap_or_default();
        let span = embedded_json_array(&text).map_err(|reason| {
            warn!(%reason, "job search response had no JSON array");
            GatewayError::UnparsableEmbeddedJson(reason)
        })?;
        let jobs: Vec<JobPosting> = serde_json::from_str(span).map_err(|e| {
            warn!(error = %e, "job search array failed to parse");
            GatewayError::UnparsableEmbeddedJson(e.to_string())
        })?;

        Ok(JobSearchResult {
            jobs,
            sources: grounding_sources(response.grounding_chunks),
        })
    }

    /// Sends `message` in the user's ongoing conversation. The conversation
    /// stays locked for the whole exchange and is only extended once a reply
    /// arrives.
    pub async fn continue_chat(&self, user_id: &str, message: &str) -> Result<String, GatewayError> {
        let handle = self.conversations.get_or_create(user_id);
        let mut conversation = handle.lock().await;

        let options = InvokeOptions {
            system_instruction: Some(prompts::TUTOR_PERSONA.to_string()),
            ..Default::default()
        };
        let reply = self
            .call_text(ModelTier::Fast, &conversation.turns_with(message), &options)
            .await?;

        conversation.record_exchange(message, &reply);
        Ok(reply)
    }

    /// Base64 audio for `text`, or `None` when speech is unavailable for any
    /// reason. Never an error.
    pub async fn generate_speech(&self, text: &str) -> Option<String> {
        let options = InvokeOptions {
            mode: ResponseMode::Audio {
                voice: SPEECH_VOICE,
            },
            ..Default::default()
        };
        match self.call(ModelTier::Speech, &[Turn::user(text)], &options).await {
            Ok(response) if response.audio_base64.is_some() => response.audio_base64,
            Ok(_) => {
                warn!("speech response carried no audio");
                None
            }
            Err(_) => {
                info!("speech unavailable, continuing without audio");
                None
            }
        }
    }
}
