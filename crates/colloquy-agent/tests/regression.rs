//! Regression tests for colloquy-agent: ModelConfig, backends over HTTP, Conversation.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use colloquy_agent::{
    Conversation, ModelBackend, ModelClient, ModelConfig, ModelProvider, TurnRequest,
};
use colloquy_core::{ColloquyError, ColloquyResult, ImageAttachment, Tone};
use colloquy_session::{
    BlobSessionStore, ContextWindow, FileSessionStore, FileTranscriptStore, MemoryBlobStore,
    Session, SessionStore, TranscriptEvent, TranscriptStore,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// --- Helpers ---

/// Backend that replays queued results and records every prompt it receives.
struct ScriptedBackend {
    replies: Mutex<VecDeque<ColloquyResult<String>>>,
    prompts: Arc<Mutex<Vec<(String, bool)>>>,
}

impl ScriptedBackend {
    fn new(replies: Vec<ColloquyResult<String>>) -> (Self, Arc<Mutex<Vec<(String, bool)>>>) {
        let prompts = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                replies: Mutex::new(replies.into()),
                prompts: prompts.clone(),
            },
            prompts,
        )
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    fn model_id(&self) -> &str {
        "scripted-1"
    }

    async fn generate(
        &self,
        prompt: &str,
        image: Option<&ImageAttachment>,
    ) -> ColloquyResult<String> {
        self.prompts.lock().push((prompt.to_string(), image.is_some()));
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ColloquyError::RemoteCall("script exhausted".into())))
    }
}

fn ok(text: &str) -> ColloquyResult<String> {
    Ok(text.to_string())
}

async fn file_conversation(
    replies: Vec<ColloquyResult<String>>,
) -> (
    Conversation<FileSessionStore>,
    Arc<FileSessionStore>,
    Arc<Mutex<Vec<(String, bool)>>>,
    tempfile::TempDir,
) {
    let tmp = tempfile::tempdir().unwrap();
    let store = Arc::new(FileSessionStore::open(tmp.path().join("sessions")).await.unwrap());
    let (backend, prompts) = ScriptedBackend::new(replies);
    let conversation = Conversation::new(ModelClient::from_backend(Box::new(backend)), store.clone());
    (conversation, store, prompts, tmp)
}

fn config_for(provider: ModelProvider, model: &str, server: &MockServer) -> ModelConfig {
    let mut config = ModelConfig::new(provider, model);
    config.api_key = "test-key".to_string();
    config.api_base_url = Some(server.uri());
    config
}

// --- ModelConfig & ModelProvider ---

#[test]
fn test_provider_serialization() {
    let cases = [
        (ModelProvider::Claude, "\"claude\""),
        (ModelProvider::OpenAi, "\"openai\""),
        (ModelProvider::OpenRouter, "\"openrouter\""),
        (ModelProvider::Groq, "\"groq\""),
        (ModelProvider::Gemini, "\"gemini\""),
    ];
    for (provider, expected) in cases {
        let json = serde_json::to_string(&provider).unwrap();
        assert_eq!(json, expected);
        let back: ModelProvider = serde_json::from_str(&json).unwrap();
        assert_eq!(back, provider);
    }
}

#[test]
fn test_model_config_deserialization_with_defaults() {
    let toml_str = r#"
        provider = "gemini"
        model_id = "gemini-1.5-flash"
    "#;
    let config: ModelConfig = toml::from_str(toml_str).unwrap();
    assert_eq!(config.provider, ModelProvider::Gemini);
    assert_eq!(config.api_key, "");
    assert_eq!(config.temperature, 0.7);
    assert_eq!(config.max_tokens, 4096);
    assert!(config.api_base_url.is_none());
    config.validate().unwrap();
}

#[test]
fn test_model_config_base_url() {
    assert_eq!(
        ModelConfig::new(ModelProvider::Claude, "m").base_url(),
        "https://api.anthropic.com"
    );
    assert_eq!(
        ModelConfig::new(ModelProvider::Gemini, "m").base_url(),
        "https://generativelanguage.googleapis.com"
    );
    let mut custom = ModelConfig::new(ModelProvider::OpenAi, "m");
    custom.api_base_url = Some("http://localhost:8080/".to_string());
    assert_eq!(custom.base_url(), "http://localhost:8080");
}

#[test]
fn test_model_config_validation() {
    let mut config = ModelConfig::new(ModelProvider::OpenAi, " ");
    assert!(matches!(config.validate(), Err(ColloquyError::Config(_))));

    config.model_id = "gpt-4o".into();
    config.temperature = 3.5;
    assert!(config.validate().is_err());

    config.temperature = 1.0;
    config.max_tokens = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_client_reports_model_id() {
    let client = ModelClient::new(ModelConfig::new(ModelProvider::Groq, "llama-3.1-8b"));
    assert_eq!(client.model_id(), "llama-3.1-8b");
}

// --- Backends over HTTP ---

#[tokio::test]
async fn test_openai_backend_roundtrip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(serde_json::json!({"model": "gpt-4o"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "pong" }, "finish_reason": "stop" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ModelClient::new(config_for(ModelProvider::OpenAi, "gpt-4o", &server));
    assert_eq!(client.generate("ping", None).await.unwrap(), "pong");
}

#[tokio::test]
async fn test_claude_backend_sends_image() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-key"))
        .and(body_partial_json(serde_json::json!({
            "messages": [{ "role": "user", "content": [
                { "type": "image", "source": { "type": "base64", "media_type": "image/png", "data": "YWJj" } },
                { "type": "text", "text": "what is it?" }
            ]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "content": [{ "type": "text", "text": "a tiny image" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ModelClient::new(config_for(ModelProvider::Claude, "claude-sonnet-4-20250514", &server));
    let image = ImageAttachment::new("image/png", b"abc".to_vec());
    let text = client.generate("what is it?", Some(&image)).await.unwrap();
    assert_eq!(text, "a tiny image");
}

#[tokio::test]
async fn test_gemini_backend_roundtrip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "bonjour" }] }, "finishReason": "STOP" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ModelClient::new(config_for(ModelProvider::Gemini, "gemini-1.5-flash", &server));
    assert_eq!(client.generate("hello in french", None).await.unwrap(), "bonjour");
}

#[tokio::test]
async fn test_http_error_becomes_remote_call_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
        .mount(&server)
        .await;

    let client = ModelClient::new(config_for(ModelProvider::OpenAi, "gpt-4o", &server));
    let err = client.generate("hi", None).await.unwrap_err();
    assert!(matches!(err, ColloquyError::RemoteCall(_)));
    assert!(err.to_string().contains("429"));
    assert!(err.to_string().contains("quota exceeded"));
}

#[tokio::test]
async fn test_unreachable_host_becomes_remote_call_error() {
    let mut config = ModelConfig::new(ModelProvider::Claude, "m");
    config.api_base_url = Some("http://127.0.0.1:9".to_string());
    let err = ModelClient::new(config).generate("hi", None).await.unwrap_err();
    assert!(err.is_remote());
}

#[tokio::test]
async fn test_non_json_body_becomes_remote_call_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = ModelClient::new(config_for(ModelProvider::Gemini, "g", &server));
    assert!(client.generate("hi", None).await.unwrap_err().is_remote());
}

// --- Conversation ---

#[tokio::test]
async fn test_send_appends_and_persists() {
    let (conversation, store, prompts, _tmp) =
        file_conversation(vec![ok("hello"), ok("goodbye")]).await;
    let mut session = Session::new();

    let first = conversation.send(&mut session, TurnRequest::new("hi")).await.unwrap();
    assert_eq!(first.response(), "hello");
    assert_eq!(first.model_identifier, "scripted-1");

    conversation.send(&mut session, TurnRequest::new("bye")).await.unwrap();

    let prompts = prompts.lock();
    assert_eq!(prompts[0].0, "hi");
    assert_eq!(prompts[1].0, "hello\n\nbye");

    let stored = store.load(session.id).await.unwrap();
    assert_eq!(stored, session);
    assert_eq!(colloquy_session::build_context(&stored), "hello goodbye");
}

#[tokio::test]
async fn test_remote_failure_does_not_mutate_session() {
    let (conversation, store, _prompts, _tmp) = file_conversation(vec![
        ok("first"),
        Err(ColloquyError::RemoteCall("503 upstream".into())),
    ])
    .await;
    let mut session = Session::new();
    conversation.send(&mut session, TurnRequest::new("a")).await.unwrap();
    let before = session.clone();

    let err = conversation
        .send(&mut session, TurnRequest::new("b"))
        .await
        .unwrap_err();
    assert!(err.is_remote());
    assert_eq!(session, before);
    assert_eq!(store.load(session.id).await.unwrap().turn_count(), 1);
}

#[tokio::test]
async fn test_tone_and_image_reach_backend_and_turn() {
    let (conversation, _store, prompts, _tmp) = file_conversation(vec![ok("a cat")]).await;
    let mut session = Session::new();
    let image = ImageAttachment::new("image/jpeg", vec![9, 9, 9]);

    let turn = conversation
        .send(
            &mut session,
            TurnRequest::new("").with_tone(Tone::Friendly).with_image(image.clone()),
        )
        .await
        .unwrap();

    assert_eq!(turn.tone, Tone::Friendly);
    assert_eq!(turn.attached_image, Some(image));
    assert_eq!(turn.user_input, "");
    let prompts = prompts.lock();
    assert_eq!(prompts[0].0, "Respond in a warm, friendly tone.");
    assert!(prompts[0].1);
}

#[tokio::test]
async fn test_context_window_bounds_prompt() {
    let (conversation, _store, prompts, _tmp) =
        file_conversation(vec![ok("one"), ok("two"), ok("three"), ok("four")]).await;
    let conversation = conversation.with_window(ContextWindow::new(Some(2), None));
    let mut session = Session::new();

    for input in ["a", "b", "c", "d"] {
        conversation.send(&mut session, TurnRequest::new(input)).await.unwrap();
    }

    assert_eq!(prompts.lock()[3].0, "two three\n\nd");
    assert_eq!(colloquy_session::build_context(&session), "one two three four");
}

#[tokio::test]
async fn test_reset_clears_and_persists() {
    let (conversation, store, _prompts, _tmp) = file_conversation(vec![ok("x")]).await;
    let mut session = Session::new();
    conversation.send(&mut session, TurnRequest::new("q")).await.unwrap();

    conversation.reset(&mut session).await.unwrap();
    assert!(session.is_empty());
    let stored = store.load(session.id).await.unwrap();
    assert_eq!(stored.id, session.id);
    assert!(stored.is_empty());
}

#[tokio::test]
async fn test_transcript_records_success_and_failure() {
    let (conversation, _store, _prompts, tmp) = file_conversation(vec![
        ok("fine"),
        Err(ColloquyError::RemoteCall("boom".into())),
    ])
    .await;
    let transcript = Arc::new(
        FileTranscriptStore::new(tmp.path().join("transcripts"))
            .await
            .unwrap(),
    );
    let conversation = conversation.with_transcript(transcript.clone());
    let mut session = Session::new();

    conversation.send(&mut session, TurnRequest::new("one")).await.unwrap();
    let _ = conversation.send(&mut session, TurnRequest::new("two")).await;
    conversation.reset(&mut session).await.unwrap();

    let events: Vec<TranscriptEvent> = transcript
        .read(session.id)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.event)
        .collect();
    assert_eq!(events.len(), 5);
    assert!(matches!(&events[0], TranscriptEvent::UserInput { content, .. } if content == "one"));
    assert!(matches!(&events[1], TranscriptEvent::ModelResponse { content, .. } if content == "fine"));
    assert!(events
        .iter()
        .any(|e| matches!(e, TranscriptEvent::RemoteFailure { error, .. } if error.contains("boom"))));
    assert!(events
        .iter()
        .any(|e| matches!(e, TranscriptEvent::SessionCleared { dropped_turns: 1 })));
}

#[tokio::test]
async fn test_transcript_is_chronological_after_reset() {
    let (conversation, _store, _prompts, tmp) =
        file_conversation(vec![ok("r1"), ok("r2"), ok("r3")]).await;
    let transcript = Arc::new(
        FileTranscriptStore::new(tmp.path().join("transcripts"))
            .await
            .unwrap(),
    );
    let conversation = conversation.with_transcript(transcript.clone());
    let mut session = Session::new();

    conversation.send(&mut session, TurnRequest::new("before-1")).await.unwrap();
    conversation.send(&mut session, TurnRequest::new("before-2")).await.unwrap();
    conversation.reset(&mut session).await.unwrap();
    conversation.send(&mut session, TurnRequest::new("after-reset")).await.unwrap();

    let order: Vec<String> = transcript
        .read(session.id)
        .await
        .unwrap()
        .into_iter()
        .map(|e| match e.event {
            TranscriptEvent::UserInput { content, .. } => format!("U:{content}"),
            TranscriptEvent::ModelResponse { content, .. } => format!("R:{content}"),
            TranscriptEvent::RemoteFailure { .. } => "F".to_string(),
            TranscriptEvent::SessionCleared { dropped_turns } => format!("C:{dropped_turns}"),
        })
        .collect();
    assert_eq!(
        order,
        vec![
            "U:before-1",
            "R:r1",
            "U:before-2",
            "R:r2",
            "C:2",
            "U:after-reset",
            "R:r3",
        ]
    );
}

/// Store whose saves always fail.
struct ReadOnlyStore;

#[async_trait]
impl SessionStore for ReadOnlyStore {
    async fn save(&self, _session: &Session) -> ColloquyResult<()> {
        Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into())
    }
    async fn load(&self, id: Uuid) -> ColloquyResult<Session> {
        Err(ColloquyError::Session(format!("cannot read {id}")))
    }
    async fn exists(&self, _id: Uuid) -> ColloquyResult<bool> {
        Ok(false)
    }
    async fn delete(&self, _id: Uuid) -> ColloquyResult<()> {
        Ok(())
    }
    async fn list(&self) -> ColloquyResult<Vec<Uuid>> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_save_failure_is_surfaced() {
    let (backend, _prompts) = ScriptedBackend::new(vec![ok("answer")]);
    let conversation = Conversation::new(
        ModelClient::from_backend(Box::new(backend)),
        Arc::new(ReadOnlyStore),
    );
    let mut session = Session::new();

    let err = conversation
        .send(&mut session, TurnRequest::new("q"))
        .await
        .unwrap_err();
    assert!(matches!(err, ColloquyError::Io(_)));
    // The model did answer, so the in-memory log keeps the turn.
    assert_eq!(session.turn_count(), 1);
}

#[tokio::test]
async fn test_restore_downgrades_load_error_to_empty() {
    let (backend, _prompts) = ScriptedBackend::new(vec![]);
    let conversation = Conversation::new(
        ModelClient::from_backend(Box::new(backend)),
        Arc::new(ReadOnlyStore),
    );
    let id = Uuid::new_v4();
    let session = conversation.restore(id).await;
    assert_eq!(session.id, id);
    assert!(session.is_empty());
}

#[tokio::test]
async fn test_memory_store_conversation() {
    let store = Arc::new(BlobSessionStore::new(MemoryBlobStore::new()));
    let (backend, _prompts) = ScriptedBackend::new(vec![ok("hello")]);
    let conversation = Conversation::new(ModelClient::from_backend(Box::new(backend)), store.clone());

    let mut session = conversation.restore(Uuid::new_v4()).await;
    conversation.send(&mut session, TurnRequest::new("hi")).await.unwrap();

    let restored = conversation.restore(session.id).await;
    assert_eq!(restored, session);
    assert_eq!(store.list().await.unwrap(), vec![session.id]);
}
