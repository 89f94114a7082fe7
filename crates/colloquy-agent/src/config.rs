use colloquy_core::{ColloquyError, ColloquyResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    Claude,
    OpenAi,
    OpenRouter,
    /// Groq cloud inference, OpenAI-compatible API.
    Groq,
    /// Google Gemini `generateContent` API.
    Gemini,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub provider: ModelProvider,
    pub model_id: String,
    #[serde(default)]
    pub api_key: String,
    pub api_base_url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    4096
}

impl ModelConfig {
    pub fn new(provider: ModelProvider, model_id: impl Into<String>) -> Self {
        Self {
            provider,
            model_id: model_id.into(),
            api_key: String::new(),
            api_base_url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }

    pub fn base_url(&self) -> &str {
        if let Some(url) = &self.api_base_url {
            url.trim_end_matches('/')
        } else {
            match self.provider {
                ModelProvider::Claude => "https://api.anthropic.com",
                ModelProvider::OpenAi => "https://api.openai.com",
                ModelProvider::OpenRouter => "https://openrouter.ai/api",
                ModelProvider::Groq => "https://api.groq.com/openai",
                ModelProvider::Gemini => "https://generativelanguage.googleapis.com",
            }
        }
    }

    pub fn validate(&self) -> ColloquyResult<()> {
        if self.model_id.trim().is_empty() {
            return Err(ColloquyError::Config("model_id must not be empty".into()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ColloquyError::Config(format!(
                "temperature {} is outside 0.0..=2.0",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(ColloquyError::Config("max_tokens must be positive".into()));
        }
        Ok(())
    }
}
