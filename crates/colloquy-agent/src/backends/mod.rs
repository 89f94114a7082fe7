pub mod claude;
pub mod gemini;
pub mod openai;

use async_trait::async_trait;
use colloquy_core::{ColloquyError, ColloquyResult, ImageAttachment};

/// Trait for remote model backends.
///
/// A backend takes one prompt (plus an optional image) and returns the
/// model's text. Every failure, whether network, quota, or a malformed
/// request, is reported as [`ColloquyError::RemoteCall`].
///
/// To add a new provider:
/// 1. Create a new module in `backends/`
/// 2. Implement `ModelBackend` for your struct
/// 3. Add the variant to `ModelProvider` in `config.rs`
/// 4. Wire it up in `ModelClient::new()` in `client.rs`
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Identifier recorded on every turn this backend answers.
    fn model_id(&self) -> &str;

    async fn generate(
        &self,
        prompt: &str,
        image: Option<&ImageAttachment>,
    ) -> ColloquyResult<String>;
}

/// Sends a JSON request and returns the decoded body of a 2xx response.
pub(crate) async fn send_json(
    request: reqwest::RequestBuilder,
    body: &serde_json::Value,
    provider: &str,
) -> ColloquyResult<serde_json::Value> {
    let resp = request
        .json(body)
        .send()
        .await
        .map_err(|e| ColloquyError::RemoteCall(format!("{provider} request failed: {e}")))?;

    let status = resp.status();
    let text = resp
        .text()
        .await
        .map_err(|e| ColloquyError::RemoteCall(format!("{provider} response unreadable: {e}")))?;

    if !status.is_success() {
        return Err(ColloquyError::RemoteCall(format!(
            "{provider} API error {status}: {text}"
        )));
    }

    serde_json::from_str(&text)
        .map_err(|e| ColloquyError::RemoteCall(format!("{provider} returned invalid JSON: {e}")))
}
