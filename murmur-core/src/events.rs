//! Notifications published by `DictationController`.
//!
//! ## Channels
//!
//! | Event | Subscription |
//! |-------|--------------|
//! | `TranscriptEvent` | `DictationController::subscribe_transcripts` |
//! | `SessionStatusEvent` | `DictationController::subscribe_status` |
//!
//! Both are `tokio::sync::broadcast` channels. Events are published while the
//! session lock is held, so receivers observe them in mutation order.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Transcript events
// ---------------------------------------------------------------------------

/// Published whenever the observed transcript may have changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptEvent {
    /// Monotonically increasing sequence number, shared with status events.
    pub seq: u64,
    /// `trim(finalized + " " + interim)`.
    pub transcript: String,
    /// Confirmed speech accumulated since the last reset.
    pub finalized_text: String,
    /// Preview of the utterance still in progress.
    pub interim_text: String,
}

// ---------------------------------------------------------------------------
// Session status events
// ---------------------------------------------------------------------------

/// Published whenever `status` or `error` changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusEvent {
    pub seq: u64,
    pub status: SessionStatus,
    /// User-facing message, if an error is currently active.
    pub error: Option<String>,
}

/// Lifecycle state of a dictation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Controller created, or activation never began.
    #[default]
    Idle,
    /// Engine is capturing and results are being merged.
    Recording,
    /// Engine is not capturing. A new `start()` may follow at any time.
    Ended,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Idle => write!(f, "Idle"),
            SessionStatus::Recording => write!(f, "Recording"),
            SessionStatus::Ended => write!(f, "Ended"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_event_serializes_with_camel_case_fields() {
        let event = TranscriptEvent {
            seq: 4,
            transcript: "turn left here".into(),
            finalized_text: "turn left".into(),
            interim_text: "here".into(),
        };

        let json = serde_json::to_value(&event).expect("serialize transcript event");
        assert_eq!(json["seq"], 4);
        assert_eq!(json["transcript"], "turn left here");
        assert_eq!(json["finalizedText"], "turn left");
        assert_eq!(json["interimText"], "here");
    }

    #[test]
    fn status_event_serializes_with_lowercase_status() {
        let event = SessionStatusEvent {
            seq: 1,
            status: SessionStatus::Recording,
            error: None,
        };

        let json = serde_json::to_value(&event).expect("serialize status event");
        assert_eq!(json["status"], "recording");
        assert!(json["error"].is_null());

        let round_trip: SessionStatusEvent =
            serde_json::from_value(json).expect("deserialize status event");
        assert_eq!(round_trip, event);
    }

    #[test]
    fn session_status_rejects_non_lowercase_values() {
        let err = serde_json::from_str::<SessionStatus>(r#""Recording""#);
        assert!(err.is_err(), "expected invalid casing to fail");
    }

    #[test]
    fn session_status_display() {
        assert_eq!(SessionStatus::Idle.to_string(), "Idle");
        assert_eq!(SessionStatus::Recording.to_string(), "Recording");
        assert_eq!(SessionStatus::Ended.to_string(), "Ended");
    }
}
