//! The `colloquy chat` loop.

use crate::repl::{self, parse_line, ReplInput};
use crate::{print_history, read_image};
use colloquy_agent::{Conversation, TurnRequest};
use colloquy_core::{ImageAttachment, Tone};
use colloquy_session::{Session, SessionManager, SessionStore};
use std::io::Write as _;
use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

/// Result of sending one chat message.
#[derive(Debug, PartialEq)]
pub enum Exchange {
    /// Answered and saved.
    Saved(String),
    /// Answered and kept in memory, but the save failed. The next successful
    /// save writes it out.
    Unsaved { answer: String, error: String },
    /// No answer; the session is unchanged.
    Failed(String),
}

/// Sends one message. Never ends the chat: every failure is reported in the
/// returned [`Exchange`].
pub async fn exchange<S: SessionStore>(
    conversation: &Conversation<S>,
    session: &mut Session,
    request: TurnRequest,
) -> Exchange {
    let before = session.turn_count();
    match conversation.send(session, request).await {
        Ok(turn) => Exchange::Saved(turn.response().to_string()),
        Err(e) => match session.last_turn() {
            Some(turn) if session.turn_count() > before => Exchange::Unsaved {
                answer: turn.response().to_string(),
                error: e.to_string(),
            },
            _ => Exchange::Failed(e.to_string()),
        },
    }
}

pub async fn run<S: SessionStore>(
    conversation: &Conversation<S>,
    manager: SessionManager<S>,
    session_id: Uuid,
    default_tone: Tone,
) -> anyhow::Result<()> {
    let handle = manager.handle(session_id).await;
    let mut session = handle.lock().await;
    let mut tone = default_tone;
    let mut pending_image: Option<ImageAttachment> = None;

    println!(
        "Session {session_id} ({} turns). /help for commands.",
        session.turn_count()
    );
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_line(&line) {
            Ok(ReplInput::Empty) => {}
            Ok(ReplInput::Exit) => break,
            Ok(ReplInput::Help) => println!("{}", repl::HELP),
            Ok(ReplInput::History) => print_history(&session),
            Ok(ReplInput::Reset) => match conversation.reset(&mut session).await {
                Ok(()) => println!("Session cleared."),
                Err(e) => eprintln!("error: session cleared but not saved: {e}"),
            },
            Ok(ReplInput::Tone(t)) => {
                tone = t;
                println!("Tone set to {tone}.");
            }
            Ok(ReplInput::Image(path)) => match read_image(&path).await {
                Ok(image) => {
                    println!("Attached {} ({} bytes).", path.display(), image.len());
                    pending_image = Some(image);
                }
                Err(e) => eprintln!("error: {e:#}"),
            },
            Ok(ReplInput::Message(text)) => {
                let mut request = TurnRequest::new(text).with_tone(tone);
                if let Some(image) = pending_image.take() {
                    request = request.with_image(image);
                }
                match exchange(conversation, &mut session, request).await {
                    Exchange::Saved(answer) => println!("{answer}"),
                    Exchange::Unsaved { answer, error } => {
                        println!("{answer}");
                        eprintln!("warning: not saved yet: {error}");
                    }
                    Exchange::Failed(error) => eprintln!("error: {error}"),
                }
            }
            Err(msg) => eprintln!("{msg}"),
        }
    }
    Ok(())
}
