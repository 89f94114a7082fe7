use crate::backends::claude::ClaudeBackend;
use crate::backends::gemini::GeminiBackend;
use crate::backends::openai::OpenAiBackend;
use crate::backends::ModelBackend;
use crate::config::{ModelConfig, ModelProvider};
use colloquy_core::{ColloquyResult, ImageAttachment};
use std::time::Instant;
use tracing::{debug, warn};

/// Model client that dispatches to the correct provider backend.
pub struct ModelClient {
    backend: Box<dyn ModelBackend>,
}

impl ModelClient {
    pub fn new(config: ModelConfig) -> Self {
        let backend: Box<dyn ModelBackend> = match config.provider {
            ModelProvider::Claude => Box::new(ClaudeBackend::new(config)),
            ModelProvider::OpenAi | ModelProvider::OpenRouter | ModelProvider::Groq => {
                Box::new(OpenAiBackend::new(config))
            }
            ModelProvider::Gemini => Box::new(GeminiBackend::new(config)),
        };
        Self { backend }
    }

    /// Create from a pre-built backend (for custom/external providers).
    pub fn from_backend(backend: Box<dyn ModelBackend>) -> Self {
        Self { backend }
    }

    pub fn model_id(&self) -> &str {
        self.backend.model_id()
    }

    /// One blocking exchange with the model. Nothing is retried.
    pub async fn generate(
        &self,
        prompt: &str,
        image: Option<&ImageAttachment>,
    ) -> ColloquyResult<String> {
        let started = Instant::now();
        let result = self.backend.generate(prompt, image).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(text) => debug!(
                model = %self.model_id(),
                prompt_chars = prompt.len(),
                response_chars = text.len(),
                elapsed_ms,
                "Model call succeeded"
            ),
            Err(e) => warn!(model = %self.model_id(), error = %e, elapsed_ms, "Model call failed"),
        }
        result
    }
}
