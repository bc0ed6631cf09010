//! Scripted `ModelBackend` for tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::llm_client::{
    GroundingChunk, InvokeOptions, LlmError, ModelBackend, ModelResponse, ModelTier, Turn,
};

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub tier: ModelTier,
    pub turns: Vec<Turn>,
    pub options: InvokeOptions,
}

/// Replies with queued responses in order. An exhausted script answers with
/// an API error. A configured delay is slept before every reply.
#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<ModelResponse, LlmError>>>,
    calls: Mutex<Vec<RecordedCall>>,
    delay: Option<Duration>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn text(self, text: &str) -> Self {
        self.reply(Ok(ModelResponse {
            text: Some(text.to_string()),
            ..Default::default()
        }))
    }

    pub fn grounded(self, text: &str, sources: &[(Option<&str>, Option<&str>)]) -> Self {
        self.reply(Ok(ModelResponse {
            text: Some(text.to_string()),
            grounding_chunks: sources
                .iter()
                .map(|(uri, title)| GroundingChunk {
                    uri: uri.map(str::to_string),
                    title: title.map(str::to_string),
                })
                .collect(),
            audio_base64: None,
        }))
    }

    pub fn audio(self, data: &str) -> Self {
        self.reply(Ok(ModelResponse {
            audio_base64: Some(data.to_string()),
            ..Default::default()
        }))
    }

    pub fn failure(self) -> Self {
        self.reply(Err(LlmError::Api {
            status: 500,
            message: "provider exploded: key=sk-secret".to_string(),
        }))
    }

    pub fn reply(self, reply: Result<ModelResponse, LlmError>) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(reply);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    async fn invoke(
        &self,
        tier: ModelTier,
        turns: &[Turn],
        options: &InvokeOptions,
    ) -> Result<ModelResponse, LlmError> {
        self.calls.lock().unwrap().push(RecordedCall {
            tier,
            turns: turns.to_vec(),
            options: options.clone(),
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.replies.lock().unwrap().pop_front();
        next.unwrap_or(Err(LlmError::Api {
            status: 500,
            message: "script exhausted".to_string(),
        }))
    }
}
