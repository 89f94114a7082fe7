use crate::client::ModelClient;
use crate::prompt::compose_prompt;
use colloquy_core::{ColloquyError, ColloquyResult, ImageAttachment, Tone, Turn};
use colloquy_session::{
    restore_or_empty, ContextWindow, Session, SessionStore, TranscriptEntry, TranscriptEvent,
    TranscriptStore,
};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// What the user supplies for one exchange.
#[derive(Debug, Clone, Default)]
pub struct TurnRequest {
    pub user_input: String,
    pub tone: Tone,
    pub image: Option<ImageAttachment>,
}

impl TurnRequest {
    pub fn new(user_input: impl Into<String>) -> Self {
        Self {
            user_input: user_input.into(),
            ..Self::default()
        }
    }

    pub fn with_tone(mut self, tone: Tone) -> Self {
        self.tone = tone;
        self
    }

    pub fn with_image(mut self, image: ImageAttachment) -> Self {
        self.image = Some(image);
        self
    }
}

/// Drives one request/response exchange at a time for a session.
///
/// Context → prompt → model → append → save. A failed model call leaves the
/// session untouched; a failed save is reported after the turn has been
/// appended in memory.
pub struct Conversation<S> {
    client: ModelClient,
    store: Arc<S>,
    window: ContextWindow,
    transcript: Option<Arc<dyn TranscriptStore>>,
}

impl<S: SessionStore> Conversation<S> {
    pub fn new(client: ModelClient, store: Arc<S>) -> Self {
        Self {
            client,
            store,
            window: ContextWindow::unbounded(),
            transcript: None,
        }
    }

    pub fn with_window(mut self, window: ContextWindow) -> Self {
        self.window = window;
        self
    }

    pub fn with_transcript(mut self, transcript: Arc<dyn TranscriptStore>) -> Self {
        self.transcript = Some(transcript);
        self
    }

    pub fn model_id(&self) -> &str {
        self.client.model_id()
    }

    pub fn window(&self) -> &ContextWindow {
        &self.window
    }

    /// Restores `id` from the store; unreadable copies start empty.
    pub async fn restore(&self, id: Uuid) -> Session {
        restore_or_empty(self.store.as_ref(), id).await
    }

    pub async fn save(&self, session: &Session) -> ColloquyResult<()> {
        self.store.save(session).await
    }

    /// Runs one exchange and returns the appended turn.
    pub async fn send(&self, session: &mut Session, request: TurnRequest) -> ColloquyResult<Turn> {
        let turn_index = session.turn_count();
        let model = self.client.model_id().to_string();

        let context = self.window.build(session);
        let prompt = compose_prompt(&context, &request.user_input, request.tone);

        self.record(
            session.id,
            turn_index,
            TranscriptEvent::UserInput {
                content: request.user_input.clone(),
                tone: request.tone,
                has_image: request.image.is_some(),
            },
        )
        .await;

        info!(
            session_id = %session.id,
            turn = turn_index,
            model = %model,
            context_tokens = ContextWindow::estimated_tokens(&context),
            "Sending turn"
        );

        let response = match self.client.generate(&prompt, request.image.as_ref()).await {
            Ok(text) => text,
            Err(e) => {
                self.record(
                    session.id,
                    turn_index,
                    TranscriptEvent::RemoteFailure {
                        model,
                        error: e.to_string(),
                    },
                )
                .await;
                return Err(e);
            }
        };

        let mut turn = Turn::new(request.user_input, model.clone())
            .with_tone(request.tone)
            .with_response(response.clone());
        turn.attached_image = request.image;

        session.append_turn(turn)?;
        self.record(
            session.id,
            turn_index,
            TranscriptEvent::ModelResponse {
                model,
                content: response,
            },
        )
        .await;

        self.store.save(session).await?;

        // `append_turn` may have adjusted the timestamp; hand back the stored copy.
        session
            .last_turn()
            .cloned()
            .ok_or_else(|| ColloquyError::Session("turn vanished after append".into()))
    }

    /// Clears the session and persists the empty log.
    pub async fn reset(&self, session: &mut Session) -> ColloquyResult<()> {
        let dropped_turns = session.turn_count();
        session.clear();
        self.record(
            session.id,
            dropped_turns,
            TranscriptEvent::SessionCleared { dropped_turns },
        )
        .await;
        info!(session_id = %session.id, dropped_turns, "Session reset");
        self.store.save(session).await
    }

    /// Transcript writes are best-effort: a failure is logged, never surfaced.
    async fn record(&self, session_id: Uuid, turn: usize, event: TranscriptEvent) {
        if let Some(transcript) = &self.transcript {
            if let Err(e) = transcript
                .append(TranscriptEntry::new(session_id, turn, event))
                .await
            {
                warn!(session_id = %session_id, error = %e, "Failed to append transcript entry");
            }
        }
    }
}
