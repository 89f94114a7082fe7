use crate::session::Session;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Space-joined responses of every turn in `session`, oldest first.
///
/// Blank responses are skipped so they do not produce doubled separators.
/// The result is unbounded; use [`ContextWindow`] to cap what is sent.
pub fn build_context(session: &Session) -> String {
    responses(session.turns.iter().map(|t| t.response())).join(" ")
}

fn responses<'a>(iter: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    iter.filter(|r| !r.trim().is_empty()).collect()
}

/// Bounds on the context handed to the model.
///
/// Recent responses win: turns are dropped oldest-first until both limits
/// hold. Responses are never split, except the newest one when it alone is
/// longer than `max_chars`, in which case only its tail is kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextWindow {
    /// Maximum number of most recent turns considered.
    #[serde(default)]
    pub max_turns: Option<usize>,
    /// Maximum length of the context in characters (not bytes).
    #[serde(default)]
    pub max_chars: Option<usize>,
}

impl ContextWindow {
    pub fn new(max_turns: Option<usize>, max_chars: Option<usize>) -> Self {
        Self {
            max_turns,
            max_chars,
        }
    }

    /// A window with no bounds; equivalent to [`build_context`].
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_turns.is_none() && self.max_chars.is_none()
    }

    pub fn build(&self, session: &Session) -> String {
        let skip = self
            .max_turns
            .map_or(0, |max| session.turns.len().saturating_sub(max));
        let candidates = responses(session.turns[skip..].iter().map(|t| t.response()));

        let mut kept: Vec<&str> = Vec::new();
        let mut used = 0usize;
        for response in candidates.iter().rev() {
            let len = response.chars().count();
            let needed = if kept.is_empty() { len } else { len + 1 };
            if let Some(max) = self.max_chars {
                if used + needed > max {
                    if kept.is_empty() {
                        kept.push(tail_chars(response, max));
                    }
                    break;
                }
            }
            used += needed;
            kept.push(response);
        }
        kept.reverse();

        if skip > 0 || kept.len() < candidates.len() || self.truncated_newest(&kept, &candidates) {
            debug!(
                session_id = %session.id,
                total_turns = session.turns.len(),
                kept = kept.len(),
                "Context window dropped older responses"
            );
        }
        kept.join(" ")
    }

    fn truncated_newest(&self, kept: &[&str], candidates: &[&str]) -> bool {
        match (kept.last(), candidates.last()) {
            (Some(k), Some(c)) => k.len() != c.len(),
            _ => false,
        }
    }

    /// Rough token estimation (4 chars ≈ 1 token).
    pub fn estimated_tokens(text: &str) -> usize {
        text.chars().count().div_ceil(4)
    }
}

fn tail_chars(s: &str, max: usize) -> &str {
    let skip = s.chars().count().saturating_sub(max);
    match s.char_indices().nth(skip) {
        Some((idx, _)) => &s[idx..],
        None => "",
    }
}
