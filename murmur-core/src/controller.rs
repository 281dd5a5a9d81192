//! `DictationController`: session lifecycle and event handling.
//!
//! ## Lifecycle
//!
//! ```text
//! DictationController::new(config, provider)   → capability detected once, status = Idle
//!     └─► start()      → engine.activate(), status = Recording
//!         ├─► stop()   → engine.deactivate(n), status = Ended (in-flight results still merged)
//!         ├─► Error    → classified, engine.deactivate(n), status = Ended
//!         └─► End      → activation retired, interim dropped, status = Ended
//!     reset()          → text and error cleared, status untouched
//! ```
//!
//! No lifecycle call returns an error. Failures are folded into `error()`
//! and announced on the status channel.
//!
//! ## Activations
//!
//! Every `start()` opens a numbered activation and hands the engine an
//! `EventSink` bound to it. Only the live activation may mutate the session;
//! events from a superseded activation, or arriving after that activation's
//! `End`, are dropped. Deactivation names the activation it targets, so a
//! late request from a finished session cannot stop its successor. Sinks
//! hold a weak reference, so nothing reaches a controller once it has been
//! dropped.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Weak,
};

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{
    capability::Capability,
    classify::{classify, ErrorClass, GENERIC_ERROR_MESSAGE, UNSUPPORTED_MESSAGE},
    config::ControllerConfig,
    engine::{
        ActivationRequest, EngineEvent, EngineProvider, EventHandler, EventSink,
        RecognitionEngine,
    },
    events::{SessionStatus, SessionStatusEvent, TranscriptEvent},
    merge::merge_event,
    session::Session,
};

/// Broadcast channel capacity per concern.
const BROADCAST_CAP: usize = 256;

struct Inner {
    session: Session,
    config: ControllerConfig,
    /// Activation whose events are merged. `None` once its `End` arrived.
    live_activation: Option<u64>,
}

struct Shared {
    inner: Mutex<Inner>,
    engine: Option<Arc<dyn RecognitionEngine>>,
    next_activation: AtomicU64,
    seq: AtomicU64,
    transcript_tx: broadcast::Sender<TranscriptEvent>,
    status_tx: broadcast::Sender<SessionStatusEvent>,
}

impl Shared {
    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    // Called with the session lock held so receivers see mutation order.
    fn publish_transcript(&self, session: &Session) {
        let _ = self.transcript_tx.send(TranscriptEvent {
            seq: self.next_seq(),
            transcript: session.observed_transcript(),
            finalized_text: session.finalized_text.clone(),
            interim_text: session.interim_text.clone(),
        });
    }

    fn publish_status(&self, session: &Session) {
        let _ = self.status_tx.send(SessionStatusEvent {
            seq: self.next_seq(),
            status: session.status,
            error: session.last_error.clone(),
        });
    }
}

impl EventHandler for Shared {
    fn handle(&self, activation: u64, event: EngineEvent) {
        let mut deactivate = false;
        {
            let mut inner = self.inner.lock();
            if inner.live_activation != Some(activation) {
                debug!(activation, "dropping event from stale activation");
                return;
            }

            match event {
                EngineEvent::Result(result) => match merge_event(&result) {
                    Some(merged) => {
                        inner.session.apply_merge(merged);
                        debug!(
                            activation,
                            finalized_len = inner.session.finalized_text.len(),
                            interim_len = inner.session.interim_text.len(),
                            "merged result event"
                        );
                        self.publish_transcript(&inner.session);
                    }
                    None => debug!(activation, "ignoring result event without text"),
                },
                EngineEvent::Error { code, message } => {
                    let class = classify(&code);
                    warn!(activation, %code, ?message, ?class, "recognition engine error");

                    let previous = (inner.session.status, inner.session.last_error.clone());
                    inner.session.status = SessionStatus::Ended;
                    if let ErrorClass::Fatal(kind) = class {
                        let message = kind.message(&inner.config.host_label);
                        inner.session.last_error = Some(message);
                    }
                    if previous != (inner.session.status, inner.session.last_error.clone()) {
                        self.publish_status(&inner.session);
                    }
                    deactivate = true;
                }
                EngineEvent::End => {
                    inner.live_activation = None;
                    if !inner.session.interim_text.is_empty() {
                        inner.session.interim_text.clear();
                        self.publish_transcript(&inner.session);
                    }
                    if inner.session.status == SessionStatus::Recording {
                        inner.session.status = SessionStatus::Ended;
                        self.publish_status(&inner.session);
                    }
                    info!(activation, "recognition session ended");
                }
            }
        }

        // Outside the lock: engines may deliver End synchronously from here.
        if deactivate {
            if let Some(engine) = &self.engine {
                engine.deactivate(activation);
            }
        }
    }
}

/// Streaming dictation session controller.
///
/// `DictationController` is `Send + Sync`; wrap it in `Arc` to share it with
/// notification-forwarding tasks. Dropping it deactivates and detaches the
/// engine.
pub struct DictationController {
    shared: Arc<Shared>,
}

impl DictationController {
    /// Query `provider` once and build an idle controller.
    pub fn new(config: ControllerConfig, provider: &dyn EngineProvider) -> Self {
        let capability = Capability::detect(provider);
        let (transcript_tx, _) = broadcast::channel(BROADCAST_CAP);
        let (status_tx, _) = broadcast::channel(BROADCAST_CAP);

        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    session: Session::new(),
                    config: config.normalized(),
                    live_activation: None,
                }),
                engine: capability.engine().cloned(),
                next_activation: AtomicU64::new(0),
                seq: AtomicU64::new(0),
                transcript_tx,
                status_tx,
            }),
        }
    }

    /// Begin (or resume, in append mode) dictation with the current config.
    ///
    /// A redundant call while already recording is a no-op.
    pub fn start(&self) {
        self.begin(None);
    }

    /// Begin dictation with `config`.
    ///
    /// While recording, an identical config is a no-op and a changed one
    /// stops the current activation and starts a new one.
    pub fn start_with(&self, config: ControllerConfig) {
        self.begin(Some(config.normalized()));
    }

    /// Ask the engine to stop capturing. No-op unless recording.
    ///
    /// Results the engine delivers before its `End` are still merged.
    pub fn stop(&self) {
        let Some(engine) = &self.shared.engine else {
            return;
        };

        let activation = {
            let mut inner = self.shared.inner.lock();
            if inner.session.status != SessionStatus::Recording {
                debug!(status = %inner.session.status, "stop ignored: not recording");
                return;
            }
            let Some(activation) = inner.live_activation else {
                return;
            };
            inner.session.status = SessionStatus::Ended;
            self.shared.publish_status(&inner.session);
            activation
        };

        engine.deactivate(activation);
        info!(activation, "dictation stop requested");
    }

    /// Discard accumulated text and any error, from any state.
    ///
    /// Recording continues if active; later finals build on an empty base.
    pub fn reset(&self) {
        let mut inner = self.shared.inner.lock();
        let before = inner.session.clone();

        inner.session.clear();

        if before.finalized_text != inner.session.finalized_text
            || before.interim_text != inner.session.interim_text
        {
            self.shared.publish_transcript(&inner.session);
        }
        if before.last_error != inner.session.last_error {
            self.shared.publish_status(&inner.session);
        }
        debug!("dictation session reset");
    }

    /// Whether the host supplied a recognition engine. Fixed at construction.
    pub fn is_supported(&self) -> bool {
        self.shared.engine.is_some()
    }

    pub fn is_recording(&self) -> bool {
        self.status() == SessionStatus::Recording
    }

    pub fn status(&self) -> SessionStatus {
        self.shared.inner.lock().session.status
    }

    /// Current observed transcript.
    pub fn transcript(&self) -> String {
        self.shared.inner.lock().session.observed_transcript()
    }

    /// Current user-facing error message, if any.
    pub fn error(&self) -> Option<String> {
        self.shared.inner.lock().session.last_error.clone()
    }

    pub fn finalized_text(&self) -> String {
        self.shared.inner.lock().session.finalized_text.clone()
    }

    pub fn interim_text(&self) -> String {
        self.shared.inner.lock().session.interim_text.clone()
    }

    pub fn config(&self) -> ControllerConfig {
        self.shared.inner.lock().config.clone()
    }

    /// Snapshot of the whole session.
    pub fn session(&self) -> Session {
        self.shared.inner.lock().session.clone()
    }

    /// Subscribe to transcript changes.
    pub fn subscribe_transcripts(&self) -> broadcast::Receiver<TranscriptEvent> {
        self.shared.transcript_tx.subscribe()
    }

    /// Subscribe to status and error changes.
    pub fn subscribe_status(&self) -> broadcast::Receiver<SessionStatusEvent> {
        self.shared.status_tx.subscribe()
    }

    // ── Internal helpers ─────────────────────────────────────────────────────

    fn begin(&self, new_config: Option<ControllerConfig>) {
        let Some(engine) = &self.shared.engine else {
            let mut inner = self.shared.inner.lock();
            if let Some(config) = new_config {
                inner.config = config;
            }
            if inner.session.last_error.as_deref() != Some(UNSUPPORTED_MESSAGE) {
                inner.session.last_error = Some(UNSUPPORTED_MESSAGE.into());
                self.shared.publish_status(&inner.session);
            }
            info!("start ignored: speech recognition unsupported");
            return;
        };

        let (activation, request, superseded) = {
            let mut inner = self.shared.inner.lock();
            let config_changed = new_config
                .as_ref()
                .is_some_and(|config| *config != inner.config);

            let restart = inner.session.status == SessionStatus::Recording;
            if restart && !config_changed {
                debug!("start ignored: already recording with the same config");
                return;
            }
            if let Some(config) = new_config {
                inner.config = config;
            }

            let text_before = (
                inner.session.finalized_text.clone(),
                inner.session.interim_text.clone(),
            );
            if !inner.config.append_mode {
                inner.session.finalized_text.clear();
                inner.session.interim_text.clear();
            }
            inner.session.last_error = None;

            let activation = self.shared.next_activation.fetch_add(1, Ordering::SeqCst) + 1;
            let superseded = inner.live_activation.replace(activation).filter(|_| restart);
            inner.session.status = SessionStatus::Recording;

            if text_before
                != (
                    inner.session.finalized_text.clone(),
                    inner.session.interim_text.clone(),
                )
            {
                self.shared.publish_transcript(&inner.session);
            }
            self.shared.publish_status(&inner.session);

            let request = ActivationRequest::new(inner.config.language_tag.clone());
            (activation, request, superseded)
        };

        if let Some(previous) = superseded {
            info!(previous, activation, "config changed while recording, restarting engine");
            engine.deactivate(previous);
        }

        let handler: Weak<Shared> = Arc::downgrade(&self.shared);
        let sink = EventSink::new(handler, activation);
        match engine.activate(&request, sink) {
            Ok(()) => info!(activation, language = %request.language_tag, "dictation started"),
            Err(e) => {
                warn!(activation, "engine activation failed: {e}");
                let mut inner = self.shared.inner.lock();
                if inner.live_activation == Some(activation) {
                    inner.live_activation = None;
                    inner.session.status = SessionStatus::Idle;
                    inner.session.last_error = Some(GENERIC_ERROR_MESSAGE.into());
                    self.shared.publish_status(&inner.session);
                }
            }
        }
    }
}

impl Drop for DictationController {
    fn drop(&mut self) {
        let live = self.shared.inner.lock().live_activation.take();
        if let Some(engine) = &self.shared.engine {
            engine.detach();
        }
        if let Some(activation) = live {
            info!(activation, "controller dropped, engine detached");
        }
    }
}

impl std::fmt::Debug for DictationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.shared.inner.lock();
        f.debug_struct("DictationController")
            .field("supported", &self.shared.engine.is_some())
            .field("status", &inner.session.status)
            .field("live_activation", &inner.live_activation)
            .finish_non_exhaustive()
    }
}
