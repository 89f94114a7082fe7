use super::{send_json, ModelBackend};
use crate::config::ModelConfig;
use async_trait::async_trait;
use colloquy_core::{ColloquyError, ColloquyResult, ImageAttachment};

/// Google Gemini `generateContent` backend.
pub struct GeminiBackend {
    config: ModelConfig,
    http: reqwest::Client,
}

impl GeminiBackend {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn build_body(&self, prompt: &str, image: Option<&ImageAttachment>) -> serde_json::Value {
        let mut parts = vec![serde_json::json!({ "text": prompt })];
        if let Some(img) = image {
            parts.push(serde_json::json!({
                "inline_data": {
                    "mime_type": img.mime_type,
                    "data": img.to_base64(),
                }
            }));
        }

        serde_json::json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": {
                "temperature": self.config.temperature,
                "maxOutputTokens": self.config.max_tokens,
            },
        })
    }
}

#[async_trait]
impl ModelBackend for GeminiBackend {
    fn model_id(&self) -> &str {
        &self.config.model_id
    }

    async fn generate(
        &self,
        prompt: &str,
        image: Option<&ImageAttachment>,
    ) -> ColloquyResult<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url(),
            self.config.model_id
        );
        let body = self.build_body(prompt, image);
        let request = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key);

        let resp_body = send_json(request, &body, "Gemini").await?;
        parse_gemini_response(&resp_body)
    }
}

pub fn parse_gemini_response(body: &serde_json::Value) -> ColloquyResult<String> {
    if let Some(reason) = body["promptFeedback"]["blockReason"].as_str() {
        return Err(ColloquyError::RemoteCall(format!(
            "Gemini blocked the prompt: {reason}"
        )));
    }

    let parts = body["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| {
            let finish = body["candidates"][0]["finishReason"]
                .as_str()
                .unwrap_or("unknown");
            ColloquyError::RemoteCall(format!(
                "Gemini response had no content (finish reason: {finish})"
            ))
        })?;

    Ok(parts.iter().filter_map(|p| p["text"].as_str()).collect())
}
