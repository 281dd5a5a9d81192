//! Result merger.
//!
//! Turns one engine `ResultEvent` into the text it contributes:
//!
//! ```text
//! results (delivery order)
//!   ├─ is_final  → "text " appended to the event's final accumulator
//!   └─ !is_final → "text"  appended to the event's interim accumulator
//!
//! both empty     → None (event discarded, existing interim untouched)
//! otherwise      → finals appended to the session ledger,
//!                  interim replaces the session preview
//! ```
//!
//! Only the first (best-guess) alternative of each result is read.

use crate::engine::ResultEvent;

/// Text contributed by a single result event, both parts trimmed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedEvent {
    pub final_text: String,
    pub interim_text: String,
}

/// Partition `event` into final and interim text.
///
/// Returns `None` when the event carries no usable text, so callers can
/// skip it without disturbing the current preview.
pub fn merge_event(event: &ResultEvent) -> Option<MergedEvent> {
    let mut final_acc = String::new();
    let mut interim_acc = String::new();

    for result in &event.results {
        let Some(text) = result.best_text() else {
            continue;
        };
        if result.is_final {
            final_acc.push_str(text);
            final_acc.push(' ');
        } else {
            interim_acc.push_str(text);
        }
    }

    let final_text = final_acc.trim();
    let interim_text = interim_acc.trim();
    if final_text.is_empty() && interim_text.is_empty() {
        return None;
    }

    Some(MergedEvent {
        final_text: final_text.to_string(),
        interim_text: interim_text.to_string(),
    })
}
