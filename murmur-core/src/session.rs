//! Session data model.
//!
//! `Session` is the single mutable unit of work owned by a
//! `DictationController`. The observed transcript is never stored: it is
//! recomputed from `finalized_text` and `interim_text` on every read.

use crate::events::SessionStatus;
use crate::merge::MergedEvent;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub status: SessionStatus,
    /// Space-joined finals since the last reset. Append-only between resets.
    pub finalized_text: String,
    /// Latest interim accumulator. Replaced wholesale by every result event.
    pub interim_text: String,
    /// At most one active user-facing error message.
    pub last_error: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// `trim(finalized_text + " " + interim_text)`.
    pub fn observed_transcript(&self) -> String {
        format!("{} {}", self.finalized_text, self.interim_text)
            .trim()
            .to_string()
    }

    /// Fold one merged result event into the session.
    pub fn apply_merge(&mut self, merged: MergedEvent) {
        if !merged.final_text.is_empty() {
            if self.finalized_text.is_empty() {
                self.finalized_text = merged.final_text;
            } else {
                self.finalized_text.push(' ');
                self.finalized_text.push_str(&merged.final_text);
            }
        }
        self.interim_text = merged.interim_text;
    }

    /// Discard accumulated text and any error. Status is untouched.
    pub fn clear(&mut self) {
        self.finalized_text.clear();
        self.interim_text.clear();
        self.last_error = None;
    }

    pub fn is_cleared(&self) -> bool {
        self.finalized_text.is_empty() && self.interim_text.is_empty() && self.last_error.is_none()
    }
}
