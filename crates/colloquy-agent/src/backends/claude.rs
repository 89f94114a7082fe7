use super::{send_json, ModelBackend};
use crate::config::ModelConfig;
use async_trait::async_trait;
use colloquy_core::{ColloquyError, ColloquyResult, ImageAttachment};

/// Claude (Anthropic) API backend.
pub struct ClaudeBackend {
    config: ModelConfig,
    http: reqwest::Client,
}

impl ClaudeBackend {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn build_body(&self, prompt: &str, image: Option<&ImageAttachment>) -> serde_json::Value {
        let mut content = Vec::new();
        if let Some(img) = image {
            content.push(serde_json::json!({
                "type": "image",
                "source": {
                    "type": "base64",
                    "media_type": img.mime_type,
                    "data": img.to_base64(),
                }
            }));
        }
        content.push(serde_json::json!({ "type": "text", "text": prompt }));

        serde_json::json!({
            "model": self.config.model_id,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "messages": [{ "role": "user", "content": content }],
        })
    }
}

#[async_trait]
impl ModelBackend for ClaudeBackend {
    fn model_id(&self) -> &str {
        &self.config.model_id
    }

    async fn generate(
        &self,
        prompt: &str,
        image: Option<&ImageAttachment>,
    ) -> ColloquyResult<String> {
        let url = format!("{}/v1/messages", self.config.base_url());
        let body = self.build_body(prompt, image);

        let request = self
            .http
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01");

        let resp_body = send_json(request, &body, "Claude").await?;
        parse_claude_response(&resp_body)
    }
}

/// Concatenates every `text` block of a Messages API response.
pub fn parse_claude_response(body: &serde_json::Value) -> ColloquyResult<String> {
    let blocks = body["content"].as_array().ok_or_else(|| {
        ColloquyError::RemoteCall(format!("Claude response had no content: {body}"))
    })?;

    let text: String = blocks
        .iter()
        .filter(|b| b["type"] == "text")
        .filter_map(|b| b["text"].as_str())
        .collect();
    Ok(text)
}
