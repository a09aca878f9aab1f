use serde::{Deserialize, Serialize};

/// Who produced an utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

impl Speaker {
    pub fn label(&self) -> &'static str {
        match self {
            Speaker::User => "User",
            Speaker::Assistant => "Assistant",
        }
    }
}

/// One finalized utterance. Immutable once created; only the reconciler
/// creates these, exactly once per observed turn boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
    /// Position in the session's turn sequence, starting at 0
    pub ordinal: usize,
}

/// Maintains the current partial text per speaker and converts turn-boundary
/// events into the session's authoritative turn sequence. Deterministic; no
/// side effects beyond its own buffers.
///
/// The wire protocol sends cumulative partial text per update, so
/// `on_partial` replaces the stored value rather than concatenating.
#[derive(Debug, Default)]
pub struct TurnReconciler {
    turns: Vec<Turn>,
    user_partial: Option<String>,
    assistant_partial: Option<String>,
}

impl TurnReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current partial text for a speaker with the latest
    /// cumulative value.
    pub fn on_partial(&mut self, speaker: Speaker, text: impl Into<String>) {
        let slot = match speaker {
            Speaker::User => &mut self.user_partial,
            Speaker::Assistant => &mut self.assistant_partial,
        };
        *slot = Some(text.into());
    }

    /// Process a turn boundary. For each non-empty finalized text, appends
    /// one immutable `Turn` (user first) and clears exactly that speaker's
    /// partial buffer. An absent or empty text finalizes nothing for that
    /// speaker and leaves its partial untouched. Returns the newly appended
    /// turns so the caller can fold them into a cumulative transcript.
    pub fn on_turn_complete(
        &mut self,
        user_text: Option<&str>,
        assistant_text: Option<&str>,
    ) -> Vec<Turn> {
        let mut finalized = Vec::new();

        if let Some(turn) = self.finalize(Speaker::User, user_text) {
            finalized.push(turn);
        }
        if let Some(turn) = self.finalize(Speaker::Assistant, assistant_text) {
            finalized.push(turn);
        }

        finalized
    }

    fn finalize(&mut self, speaker: Speaker, text: Option<&str>) -> Option<Turn> {
        let text = text?.trim();
        if text.is_empty() {
            // Empty turns are not recorded
            return None;
        }

        let turn = Turn {
            speaker,
            text: text.to_string(),
            ordinal: self.turns.len(),
        };
        self.turns.push(turn.clone());

        match speaker {
            Speaker::User => self.user_partial = None,
            Speaker::Assistant => self.assistant_partial = None,
        }

        Some(turn)
    }

    /// Current in-progress text for a speaker, if any.
    pub fn partial(&self, speaker: Speaker) -> Option<&str> {
        match speaker {
            Speaker::User => self.user_partial.as_deref(),
            Speaker::Assistant => self.assistant_partial.as_deref(),
        }
    }

    /// The finalized turn sequence: append-only, never reordered.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Plain-text rendering of the turn sequence, one "Speaker: text" line
    /// per turn in finalization order. This is the form handed to the
    /// downstream analysis service.
    pub fn transcript(&self) -> String {
        self.turns
            .iter()
            .map(|t| format!("{}: {}", t.speaker.label(), t.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
