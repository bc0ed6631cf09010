//! LLM Client: the single point of entry for all generative-model calls.
//!
//! ARCHITECTURAL RULE: No other module may call the model provider directly.
//! Every request goes through a `ModelBackend`; `LlmClient` is the one that
//! speaks the Gemini `generateContent` REST protocol.
//!
//! Model names are fixed per tier (see `ModelTier::model`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Voice used for every speech request.
pub const SPEECH_VOICE: &str = "Kore";
/// Thinking budget for the reasoning tier's structured and search calls.
pub const REASONING_THINKING_BUDGET: u32 = 32768;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("no API key configured")]
    MissingApiKey,

    #[error("model returned empty content")]
    EmptyContent,

    #[error("model call timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    Fast,
    Reasoning,
    Speech,
}

impl ModelTier {
    pub fn model(self) -> &'static str {
        match self {
            ModelTier::Fast => "gemini-2.5-flash",
            ModelTier::Reasoning => "gemini-2.5-pro",
            ModelTier::Speech => "gemini-2.5-flash-preview-tts",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Model,
}

impl ChatRole {
    fn as_str(self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Model => "model",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub role: ChatRole,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ResponseMode {
    #[default]
    Text,
    /// Output constrained to `schema` (provider schema dialect).
    Json { schema: Value },
    Audio { voice: &'static str },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct InvokeOptions {
    pub mode: ResponseMode,
    pub search_grounding: bool,
    pub system_instruction: Option<String>,
    pub thinking_budget: Option<u32>,
}

/// A citation attached to a search-grounded response, as the provider sent it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroundingChunk {
    pub uri: Option<String>,
    pub title: Option<String>,
}

/// A provider response reduced to what callers consume.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelResponse {
    pub text: Option<String>,
    pub grounding_chunks: Vec<GroundingChunk>,
    pub audio_base64: Option<String>,
}

/// The call surface to the external model. Implemented by `LlmClient`;
/// tests substitute a scripted backend.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn invoke(
        &self,
        tier: ModelTier,
        turns: &[Turn],
        options: &InvokeOptions,
    ) -> Result<ModelResponse, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Wire format
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<WireContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireContent<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
    #[serde(skip_serializing_if = "GenerationConfig::is_empty")]
    generation_config: GenerationConfig<'a>,
}

#[derive(Debug, Serialize)]
struct WireContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<WirePart<'a>>,
}

#[derive(Debug, Serialize)]
struct WirePart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireTool {
    google_search: Value,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<&'a str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfig>,
}

impl GenerationConfig<'_> {
    fn is_empty(&self) -> bool {
        self.response_mime_type.is_none()
            && self.response_schema.is_none()
            && self.response_modalities.is_none()
            && self.speech_config.is_none()
            && self.thinking_config.is_none()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig<'a> {
    voice_config: VoiceConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig<'a> {
    prebuilt_voice_config: PrebuiltVoice<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoice<'a> {
    voice_name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

impl<'a> GenerateContentRequest<'a> {
    fn build(turns: &'a [Turn], options: &'a InvokeOptions) -> Self {
        let contents = turns
            .iter()
            .map(|t| WireContent {
                role: Some(t.role.as_str()),
                parts: vec![WirePart { text: &t.text }],
            })
            .collect();

        let system_instruction = options.system_instruction.as_deref().map(|text| WireContent {
            role: None,
            parts: vec![WirePart { text }],
        });

        let tools = if options.search_grounding {
            vec![WireTool {
                google_search: Value::Object(Default::default()),
            }]
        } else {
            vec![]
        };

        let mut generation_config = GenerationConfig {
            thinking_config: options
                .thinking_budget
                .map(|thinking_budget| ThinkingConfig { thinking_budget }),
            ..Default::default()
        };
        match &options.mode {
            ResponseMode::Text => {}
            ResponseMode::Json { schema } => {
                generation_config.response_mime_type = Some("application/json");
                generation_config.response_schema = Some(schema);
            }
            ResponseMode::Audio { voice } => {
                generation_config.response_modalities = Some(vec!["AUDIO"]);
                generation_config.speech_config = Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoice { voice_name: *voice },
                    },
                });
            }
        }

        Self {
            contents,
            system_instruction,
            tools,
            generation_config,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    inline_data: Option<InlineData>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<WireGroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct WireGroundingChunk {
    web: Option<WebSource>,
}

#[derive(Debug, Deserialize)]
struct WebSource {
    uri: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    error: ProviderErrorBody,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    message: String,
}

impl GenerateContentResponse {
    /// Keeps the first candidate only. Text is every non-thought text part
    /// joined; audio is the first inline payload.
    fn into_model_response(self) -> ModelResponse {
        let Some(candidate) = self.candidates.into_iter().next() else {
            return ModelResponse::default();
        };

        let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
        let text: String = parts
            .iter()
            .filter(|p| !p.thought)
            .filter_map(|p| p.text.as_deref())
            .collect();
        let audio_base64 = parts
            .into_iter()
            .find_map(|p| p.inline_data.map(|d| d.data));

        let grounding_chunks = candidate
            .grounding_metadata
            .map(|m| m.grounding_chunks)
            .unwrap_or_default()
            .into_iter()
            .map(|chunk| match chunk.web {
                Some(web) => GroundingChunk {
                    uri: web.uri,
                    title: web.title,
                },
                None => GroundingChunk::default(),
            })
            .collect();

        ModelResponse {
            text: (!text.is_empty()).then_some(text),
            grounding_chunks,
            audio_base64,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// LlmClient
// ────────────────────────────────────────────────────────────────────────────

/// The single Gemini client used by the AI gateway. No retries: a failed
/// call is reported once and the caller decides.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl LlmClient {
    pub fn new(api_key: Option<String>, base_url: &str, timeout: Duration) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, tier: ModelTier) -> String {
        format!("{}/models/{}:generateContent", self.base_url, tier.model())
    }
}

#[async_trait]
impl ModelBackend for LlmClient {
    async fn invoke(
        &self,
        tier: ModelTier,
        turns: &[Turn],
        options: &InvokeOptions,
    ) -> Result<ModelResponse, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::MissingApiKey)?;
        let body = GenerateContentRequest::build(turns, options);

        let response = self
            .client
            .post(self.endpoint(tier))
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ProviderError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let raw: GenerateContentResponse = serde_json::from_slice(&response.bytes().await?)?;
        let normalized = raw.into_model_response();
        debug!(
            model = tier.model(),
            text_len = normalized.text.as_deref().map_or(0, str::len),
            sources = normalized.grounding_chunks.len(),
            audio = normalized.audio_base64.is_some(),
            "model call succeeded"
        );
        Ok(normalized)
    }
}

/// Unwraps a payload from a markdown code fence, with or without a language
/// tag. Text without a leading fence is returned trimmed.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (`json`, `JSON`, ...) up to the first newline.
    let body = match rest.find('\n') {
        Some(idx) if rest[..idx].chars().all(|c| c.is_ascii_alphanumeric()) => &rest[idx + 1..],
        _ => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n[1, 2]\n```";
        assert_eq!(strip_json_fences(input), "[1, 2]");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        assert_eq!(strip_json_fences("  {\"a\": 1}\n"), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_json_fences_unterminated() {
        assert_eq!(strip_json_fences("```json\n{\"a\": 1}"), "{\"a\": 1}");
    }

    #[test]
    fn test_request_body_for_schema_call() {
        let turns = vec![Turn::user("plan rust")];
        let options = InvokeOptions {
            mode: ResponseMode::Json {
                schema: json!({"type": "OBJECT"}),
            },
            thinking_budget: Some(REASONING_THINKING_BUDGET),
            ..Default::default()
        };
        let body = serde_json::to_value(GenerateContentRequest::build(&turns, &options)).unwrap();
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "plan rust");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "OBJECT");
        assert_eq!(body["generationConfig"]["thinkingConfig"]["thinkingBudget"], 32768);
        assert!(body.get("tools").is_none());
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn test_request_body_for_grounded_chat() {
        let turns = vec![Turn::user("hi"), Turn::model("hello"), Turn::user("trends?")];
        let options = InvokeOptions {
            search_grounding: true,
            system_instruction: Some("be brief".to_string()),
            ..Default::default()
        };
        let body = serde_json::to_value(GenerateContentRequest::build(&turns, &options)).unwrap();
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["tools"][0]["googleSearch"], json!({}));
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be brief");
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn test_request_body_for_speech() {
        let turns = vec![Turn::user("read this")];
        let options = InvokeOptions {
            mode: ResponseMode::Audio { voice: SPEECH_VOICE },
            ..Default::default()
        };
        let body = serde_json::to_value(GenerateContentRequest::build(&turns, &options)).unwrap();
        let config = &body["generationConfig"];
        assert_eq!(config["responseModalities"], json!(["AUDIO"]));
        assert_eq!(
            config["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]["voiceName"],
            "Kore"
        );
    }

    #[test]
    fn test_response_skips_thought_parts_and_keeps_sources() {
        let raw: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"parts": [
                    {"text": "thinking...", "thought": true},
                    {"text": "Rust is "},
                    {"text": "growing."}
                ]},
                "groundingMetadata": {"groundingChunks": [
                    {"web": {"uri": "https://a.example", "title": "A"}},
                    {"web": {"title": "no link"}},
                    {}
                ]}
            }]
        }))
        .unwrap();
        let response = raw.into_model_response();
        assert_eq!(response.text.as_deref(), Some("Rust is growing."));
        assert_eq!(response.grounding_chunks.len(), 3);
        assert_eq!(response.grounding_chunks[0].uri.as_deref(), Some("https://a.example"));
        assert_eq!(response.grounding_chunks[1].uri, None);
        assert_eq!(response.audio_base64, None);
    }

    #[test]
    fn test_response_audio_payload() {
        let raw: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [
                {"inlineData": {"mimeType": "audio/L16;rate=24000", "data": "UklGRg=="}}
            ]}}]
        }))
        .unwrap();
        let response = raw.into_model_response();
        assert_eq!(response.audio_base64.as_deref(), Some("UklGRg=="));
        assert_eq!(response.text, None);
    }

    #[test]
    fn test_response_without_candidates_is_empty() {
        let raw: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(raw.into_model_response(), ModelResponse::default());
    }

    #[test]
    fn test_endpoint_uses_tier_model() {
        let client = LlmClient::new(None, "https://example.test/v1beta/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            client.endpoint(ModelTier::Reasoning),
            "https://example.test/v1beta/models/gemini-2.5-pro:generateContent"
        );
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_before_network() {
        let client = LlmClient::new(None, DEFAULT_API_URL, Duration::from_secs(5)).unwrap();
        let err = client
            .invoke(ModelTier::Fast, &[Turn::user("hi")], &InvokeOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::MissingApiKey));
    }
}
