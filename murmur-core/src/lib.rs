//! # murmur-core
//!
//! Streaming dictation session controller.
//!
//! ## Architecture
//!
//! ```text
//! caller ─► DictationController::start/stop/reset
//!                 │
//!       RecognitionEngine::activate(request, EventSink)
//!                 │
//!       EngineEvent::{Result, Error, End} ─► merge / classify
//!                 │
//!       broadcast::Sender<TranscriptEvent | SessionStatusEvent>
//! ```
//!
//! The engine is supplied by the host through an `EngineProvider`; the
//! controller never inspects the environment itself.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod capability;
pub mod classify;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod events;
pub mod merge;
pub mod session;

// Convenience re-exports for downstream crates
pub use capability::Capability;
pub use config::ControllerConfig;
pub use controller::DictationController;
pub use engine::{
    ActivationRequest, Alternative, EngineErrorCode, EngineEvent, EngineProvider, EventSink,
    RecognitionEngine, RecognitionResult, ResultEvent, ScriptStep, ScriptedEngine,
    StaticProvider, UnavailableProvider,
};
pub use error::MurmurError;
pub use events::{SessionStatus, SessionStatusEvent, TranscriptEvent};
pub use session::Session;
