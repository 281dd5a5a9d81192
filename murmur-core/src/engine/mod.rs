//! Recognition engine abstraction.
//!
//! The `RecognitionEngine` trait decouples the controller from whatever
//! streaming recogniser the host supplies (platform speech service, cloud
//! stream, `ScriptedEngine` replay, test fakes).
//!
//! Methods take `&self`: engines deliver events from their own threads and
//! must be shareable, so any mutable state lives behind the implementor's
//! own lock.
//!
//! ## Event flow
//!
//! ```text
//! controller.start() ─► engine.activate(request, sink)
//!                            │
//!                  sink.deliver(EngineEvent::Result | Error | End)
//!                            │
//!                  controller merges synchronously, publishes events
//! ```

pub mod scripted;

pub use scripted::{ScriptStep, ScriptedEngine};

use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};

use crate::error::{MurmurError, Result};

/// Contract for streaming speech recognition backends.
pub trait RecognitionEngine: Send + Sync + 'static {
    /// Begin streaming capture.
    ///
    /// Every event for this activation must be delivered through `sink`, in
    /// order, and the activation must end with exactly one
    /// `EngineEvent::End`. Do not hold the engine's own locks while calling
    /// `EventSink::deliver`: the controller may call `deactivate` from
    /// inside delivery.
    ///
    /// # Errors
    /// Returns an error if capture could not begin at all. No `End` is
    /// expected in that case.
    fn activate(&self, request: &ActivationRequest, sink: EventSink) -> Result<()>;

    /// Request capture to stop for `activation` (the number carried by its
    /// `EventSink`). Results already in flight may still be delivered
    /// before `End`.
    ///
    /// Must be idempotent, and must ignore any activation other than the
    /// one currently capturing: a deactivation for a finished session can
    /// arrive after the next one has started.
    fn deactivate(&self, activation: u64);

    /// Stop whatever capture is running and release every sink this engine
    /// still holds.
    ///
    /// Called when the owning controller is dropped.
    fn detach(&self);
}

/// Parameters passed to `RecognitionEngine::activate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationRequest {
    /// BCP-47 locale such as `"en-US"`, passed through unmodified.
    pub language_tag: String,
    /// Keep capturing across pauses instead of stopping after one utterance.
    pub continuous: bool,
    /// Report interim (revisable) results in addition to finals.
    pub interim_results: bool,
    /// Alternatives requested per result. Only the first is ever used.
    pub max_alternatives: u32,
}

impl ActivationRequest {
    pub fn new(language_tag: impl Into<String>) -> Self {
        Self {
            language_tag: language_tag.into(),
            continuous: true,
            interim_results: true,
            max_alternatives: 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine events
// ---------------------------------------------------------------------------

/// One event delivered by an engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EngineEvent {
    /// New or revised recognition results.
    Result(ResultEvent),
    /// The engine reported a failure. Capture is over for this activation.
    Error {
        code: EngineErrorCode,
        #[serde(default)]
        message: Option<String>,
    },
    /// Capture stopped, for any reason. Fired once per activation.
    End,
}

/// Ordered results carried by one `EngineEvent::Result`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEvent {
    pub results: Vec<RecognitionResult>,
}

impl ResultEvent {
    pub fn new(results: Vec<RecognitionResult>) -> Self {
        Self { results }
    }
}

/// A single recognition result with its ranked alternatives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionResult {
    /// `true` once the engine will no longer revise this result.
    pub is_final: bool,
    /// Best guess first.
    pub alternatives: Vec<Alternative>,
}

impl RecognitionResult {
    /// A committed result with a single alternative.
    pub fn finalized(text: impl Into<String>) -> Self {
        Self {
            is_final: true,
            alternatives: vec![Alternative::new(text)],
        }
    }

    /// A provisional result with a single alternative.
    pub fn interim(text: impl Into<String>) -> Self {
        Self {
            is_final: false,
            alternatives: vec![Alternative::new(text)],
        }
    }

    /// Text of the best-guess alternative, if any.
    pub fn best_text(&self) -> Option<&str> {
        self.alternatives.first().map(|a| a.text.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alternative {
    pub text: String,
    #[serde(default)]
    pub confidence: Option<f32>,
}

impl Alternative {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: None,
        }
    }
}

/// Engine-reported error code. The set is open: unknown codes are kept
/// verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EngineErrorCode {
    NoSpeech,
    Aborted,
    NotAllowed,
    ServiceNotAllowed,
    AudioCapture,
    Network,
    LanguageNotSupported,
    Other(String),
}

impl EngineErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            EngineErrorCode::NoSpeech => "no-speech",
            EngineErrorCode::Aborted => "aborted",
            EngineErrorCode::NotAllowed => "not-allowed",
            EngineErrorCode::ServiceNotAllowed => "service-not-allowed",
            EngineErrorCode::AudioCapture => "audio-capture",
            EngineErrorCode::Network => "network",
            EngineErrorCode::LanguageNotSupported => "language-not-supported",
            EngineErrorCode::Other(code) => code,
        }
    }
}

impl From<&str> for EngineErrorCode {
    fn from(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "no-speech" => EngineErrorCode::NoSpeech,
            "aborted" => EngineErrorCode::Aborted,
            "not-allowed" => EngineErrorCode::NotAllowed,
            "service-not-allowed" => EngineErrorCode::ServiceNotAllowed,
            "audio-capture" => EngineErrorCode::AudioCapture,
            "network" => EngineErrorCode::Network,
            "language-not-supported" => EngineErrorCode::LanguageNotSupported,
            _ => EngineErrorCode::Other(raw.to_string()),
        }
    }
}

impl From<String> for EngineErrorCode {
    fn from(raw: String) -> Self {
        EngineErrorCode::from(raw.as_str())
    }
}

impl From<EngineErrorCode> for String {
    fn from(code: EngineErrorCode) -> Self {
        code.as_str().to_string()
    }
}

impl std::fmt::Display for EngineErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Event sink
// ---------------------------------------------------------------------------

/// Receiver side of an `EventSink`. Implemented by the controller.
pub(crate) trait EventHandler: Send + Sync {
    fn handle(&self, activation: u64, event: EngineEvent);
}

/// Handle an engine uses to deliver events for one activation.
///
/// Holds only a weak reference to the controller: once the controller is
/// dropped, delivery is a no-op. Events for an activation the controller no
/// longer tracks (superseded by a restart, or already ended) are ignored.
#[derive(Clone)]
pub struct EventSink {
    handler: Weak<dyn EventHandler>,
    activation: u64,
}

impl EventSink {
    pub(crate) fn new(handler: Weak<dyn EventHandler>, activation: u64) -> Self {
        Self {
            handler,
            activation,
        }
    }

    /// Activation number this sink is bound to.
    pub fn activation(&self) -> u64 {
        self.activation
    }

    /// Deliver one event. Returns `false` if the controller is gone.
    ///
    /// Processing is synchronous: when this returns, the controller state
    /// already reflects `event`.
    pub fn deliver(&self, event: EngineEvent) -> bool {
        match self.handler.upgrade() {
            Some(handler) => {
                handler.handle(self.activation, event);
                true
            }
            None => false,
        }
    }

    pub fn results(&self, results: Vec<RecognitionResult>) -> bool {
        self.deliver(EngineEvent::Result(ResultEvent::new(results)))
    }

    pub fn error(&self, code: impl Into<EngineErrorCode>, message: Option<String>) -> bool {
        self.deliver(EngineEvent::Error {
            code: code.into(),
            message,
        })
    }

    pub fn end(&self) -> bool {
        self.deliver(EngineEvent::End)
    }

    /// `true` while the owning controller is alive.
    pub fn is_connected(&self) -> bool {
        self.handler.strong_count() > 0
    }
}

impl std::fmt::Debug for EventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSink")
            .field("activation", &self.activation)
            .field("connected", &self.is_connected())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

/// Factory injected into the controller in place of ambient host probing.
pub trait EngineProvider {
    /// Whether the host can supply an engine at all.
    fn is_available(&self) -> bool;

    /// Build the engine. Called at most once per controller.
    ///
    /// # Errors
    /// Returns an error if the host advertised the capability but the engine
    /// could not be constructed.
    fn create(&self) -> Result<Arc<dyn RecognitionEngine>>;
}

/// Provider that hands out an already-constructed engine.
#[derive(Clone)]
pub struct StaticProvider {
    engine: Arc<dyn RecognitionEngine>,
}

impl StaticProvider {
    pub fn new<E: RecognitionEngine>(engine: E) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }

    pub fn from_arc(engine: Arc<dyn RecognitionEngine>) -> Self {
        Self { engine }
    }
}

impl EngineProvider for StaticProvider {
    fn is_available(&self) -> bool {
        true
    }

    fn create(&self) -> Result<Arc<dyn RecognitionEngine>> {
        Ok(Arc::clone(&self.engine))
    }
}

/// Provider for hosts without any speech capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableProvider;

impl EngineProvider for UnavailableProvider {
    fn is_available(&self) -> bool {
        false
    }

    fn create(&self) -> Result<Arc<dyn RecognitionEngine>> {
        Err(MurmurError::EngineUnavailable)
    }
}
