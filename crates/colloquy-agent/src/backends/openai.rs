use super::{send_json, ModelBackend};
use crate::config::{ModelConfig, ModelProvider};
use async_trait::async_trait;
use colloquy_core::{ColloquyError, ColloquyResult, ImageAttachment};

/// OpenAI-compatible API backend.
///
/// Works with OpenAI, OpenRouter, Groq, Ollama, and any other provider
/// that implements the OpenAI chat completions API.
pub struct OpenAiBackend {
    config: ModelConfig,
    http: reqwest::Client,
}

impl OpenAiBackend {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn build_body(&self, prompt: &str, image: Option<&ImageAttachment>) -> serde_json::Value {
        let content = match image {
            Some(img) => serde_json::json!([
                { "type": "text", "text": prompt },
                { "type": "image_url", "image_url": { "url": img.to_data_url() } }
            ]),
            None => serde_json::json!(prompt),
        };

        serde_json::json!({
            "model": self.config.model_id,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "messages": [{ "role": "user", "content": content }],
        })
    }

    fn add_provider_headers(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request.header("Authorization", format!("Bearer {}", self.config.api_key));

        // OpenRouter requires extra headers
        if matches!(self.config.provider, ModelProvider::OpenRouter) {
            request.header("X-Title", "Colloquy")
        } else {
            request
        }
    }
}

#[async_trait]
impl ModelBackend for OpenAiBackend {
    fn model_id(&self) -> &str {
        &self.config.model_id
    }

    async fn generate(
        &self,
        prompt: &str,
        image: Option<&ImageAttachment>,
    ) -> ColloquyResult<String> {
        let url = format!("{}/v1/chat/completions", self.config.base_url());
        let body = self.build_body(prompt, image);
        let request = self.add_provider_headers(self.http.post(&url));

        let resp_body = send_json(request, &body, "OpenAI").await?;
        parse_openai_response(&resp_body)
    }
}

pub fn parse_openai_response(body: &serde_json::Value) -> ColloquyResult<String> {
    body["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| {
            ColloquyError::RemoteCall(format!("OpenAI response had no message content: {body}"))
        })
}
