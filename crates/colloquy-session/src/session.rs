use chrono::{DateTime, Utc};
use colloquy_core::{ColloquyError, ColloquyResult, Turn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// An ordered turn log for one conversation, oldest turn first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub turns: Vec<Turn>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Session {
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4())
    }

    /// An empty session carrying an existing identity.
    pub fn with_id(id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            turns: Vec::new(),
            created_at: now,
            updated_at: now,
            metadata: HashMap::new(),
        }
    }

    /// Appends a resolved turn.
    ///
    /// Fails with [`ColloquyError::InvalidTurn`] when the turn has no response
    /// yet; the session is left untouched in that case. A `created_at` older
    /// than the last turn's is raised to it so timestamps never go backwards.
    pub fn append_turn(&mut self, mut turn: Turn) -> ColloquyResult<()> {
        if !turn.is_resolved() {
            return Err(ColloquyError::InvalidTurn(format!(
                "turn {} has no response_text",
                turn.id
            )));
        }
        if let Some(last) = self.turns.last() {
            if turn.created_at < last.created_at {
                turn.created_at = last.created_at;
            }
        }
        self.updated_at = Utc::now();
        self.turns.push(turn);
        Ok(())
    }

    /// Drops every turn, keeping the identity and metadata.
    pub fn clear(&mut self) {
        self.turns.clear();
        self.updated_at = Utc::now();
    }

    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last_turn(&self) -> Option<&Turn> {
        self.turns.last()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
