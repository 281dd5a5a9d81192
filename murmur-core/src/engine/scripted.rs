//! `ScriptedEngine`: replays a fixed list of engine events.
//!
//! Stands in for a platform recogniser so the controller, host app and tests
//! can be exercised end-to-end without a microphone. Each activation spawns a
//! playback thread that walks the script, honouring per-step delays, and
//! always finishes with exactly one `End`.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{ActivationRequest, EngineEvent, EventSink, RecognitionEngine};
use crate::error::{MurmurError, Result};

/// One scripted event, delivered `delay_ms` after the previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptStep {
    #[serde(default)]
    pub delay_ms: u64,
    pub event: EngineEvent,
}

impl ScriptStep {
    pub fn new(delay_ms: u64, event: EngineEvent) -> Self {
        Self { delay_ms, event }
    }
}

struct Playback {
    activation: u64,
    stop_tx: Sender<()>,
    _thread: JoinHandle<()>,
}

/// Replay engine.
///
/// `deactivate` interrupts the matching playback at the next step boundary
/// and emits `End`; a number from an earlier activation is ignored. An `Error` step is followed by `End`, mirroring how platform
/// recognisers close a session after reporting a failure.
pub struct ScriptedEngine {
    script: Vec<ScriptStep>,
    playback: Mutex<Option<Playback>>,
    activations: AtomicUsize,
    last_request: Mutex<Option<ActivationRequest>>,
}

impl ScriptedEngine {
    /// # Errors
    /// `MurmurError::InvalidScript` if an `End` step is not the last step.
    pub fn new(script: Vec<ScriptStep>) -> Result<Self> {
        if let Some(idx) = script
            .iter()
            .position(|step| step.event == EngineEvent::End)
        {
            if idx + 1 != script.len() {
                return Err(MurmurError::InvalidScript(format!(
                    "end event at step {idx} is followed by {} more step(s)",
                    script.len() - idx - 1
                )));
            }
        }

        Ok(Self {
            script,
            playback: Mutex::new(None),
            activations: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        })
    }

    /// Parse a JSON array of `ScriptStep`s.
    pub fn from_json(raw: &str) -> Result<Self> {
        let steps: Vec<ScriptStep> = serde_json::from_str(raw)?;
        Self::new(steps)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn script(&self) -> &[ScriptStep] {
        &self.script
    }

    /// Number of successful `activate` calls so far.
    pub fn activation_count(&self) -> usize {
        self.activations.load(Ordering::SeqCst)
    }

    /// Request passed to the most recent `activate`.
    pub fn last_request(&self) -> Option<ActivationRequest> {
        self.last_request.lock().clone()
    }

    fn stop_playback(&self) -> Option<Playback> {
        let playback = self.playback.lock().take();
        if let Some(p) = &playback {
            let _ = p.stop_tx.try_send(());
        }
        playback
    }
}

impl RecognitionEngine for ScriptedEngine {
    fn activate(&self, request: &ActivationRequest, sink: EventSink) -> Result<()> {
        // A restart supersedes the previous playback; its End goes to a stale sink.
        self.stop_playback();

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let steps = self.script.clone();
        let activation = sink.activation();

        let thread = thread::Builder::new()
            .name(format!("murmur-script-{activation}"))
            .spawn(move || {
                for step in steps {
                    match stop_rx.recv_timeout(Duration::from_millis(step.delay_ms)) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                            debug!(activation, "scripted playback interrupted");
                            break;
                        }
                    }

                    match step.event {
                        EngineEvent::End => break,
                        event @ EngineEvent::Error { .. } => {
                            sink.deliver(event);
                            break;
                        }
                        event => {
                            if !sink.deliver(event) {
                                debug!(activation, "controller gone, ending playback");
                                return;
                            }
                        }
                    }
                }
                sink.end();
            })?;

        *self.playback.lock() = Some(Playback {
            activation,
            stop_tx,
            _thread: thread,
        });
        *self.last_request.lock() = Some(request.clone());
        self.activations.fetch_add(1, Ordering::SeqCst);
        info!(
            activation,
            language = %request.language_tag,
            steps = self.script.len(),
            "scripted engine activated"
        );
        Ok(())
    }

    fn deactivate(&self, activation: u64) {
        match self.playback.lock().as_ref() {
            Some(p) if p.activation == activation => {
                let _ = p.stop_tx.try_send(());
            }
            Some(p) => debug!(
                activation,
                current = p.activation,
                "ignoring deactivate for superseded playback"
            ),
            None => {}
        }
    }

    fn detach(&self) {
        if self.stop_playback().is_some() {
            debug!("scripted engine detached");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EventHandler, RecognitionResult, ResultEvent};
    use std::sync::{Arc, Weak};
    use std::time::Instant;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<EngineEvent>>);

    impl EventHandler for Recorder {
        fn handle(&self, _activation: u64, event: EngineEvent) {
            self.0.lock().push(event);
        }
    }

    fn sink_for(recorder: &Arc<Recorder>, activation: u64) -> EventSink {
        let weak: Weak<Recorder> = Arc::downgrade(recorder);
        EventSink::new(weak, activation)
    }

    fn wait_for_end(recorder: &Recorder) -> Vec<EngineEvent> {
        let start = Instant::now();
        loop {
            {
                let events = recorder.0.lock();
                if events.last() == Some(&EngineEvent::End) {
                    return events.clone();
                }
            }
            if start.elapsed() > Duration::from_secs(2) {
                panic!("timed out waiting for scripted End");
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    fn result_step(text: &str, is_final: bool) -> ScriptStep {
        let result = if is_final {
            RecognitionResult::finalized(text)
        } else {
            RecognitionResult::interim(text)
        };
        ScriptStep::new(0, EngineEvent::Result(ResultEvent::new(vec![result])))
    }

    #[test]
    fn rejects_end_before_last_step() {
        let script = vec![
            ScriptStep::new(0, EngineEvent::End),
            result_step("late", true),
        ];
        assert!(matches!(
            ScriptedEngine::new(script),
            Err(MurmurError::InvalidScript(_))
        ));
    }

    #[test]
    fn replays_script_then_ends_once() {
        let engine = ScriptedEngine::new(vec![
            result_step("turn left", false),
            result_step("turn left here", true),
            ScriptStep::new(0, EngineEvent::End),
        ])
        .expect("valid script");
        let recorder = Arc::new(Recorder::default());

        engine
            .activate(&ActivationRequest::new("en-US"), sink_for(&recorder, 1))
            .expect("activate");
        let events = wait_for_end(&recorder);

        assert_eq!(events.len(), 3);
        assert_eq!(
            events.iter().filter(|e| **e == EngineEvent::End).count(),
            1
        );
        assert_eq!(engine.activation_count(), 1);
        assert_eq!(
            engine.last_request().map(|r| r.language_tag),
            Some("en-US".to_string())
        );
    }

    #[test]
    fn error_step_is_followed_by_end() {
        let engine = ScriptedEngine::from_json(
            r#"[{"event": {"type": "error", "code": "network"}},
                {"event": {"type": "result", "results": []}}]"#,
        )
        .expect("valid script");
        let recorder = Arc::new(Recorder::default());

        engine
            .activate(&ActivationRequest::new("en-US"), sink_for(&recorder, 1))
            .expect("activate");
        let events = wait_for_end(&recorder);

        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], EngineEvent::Error { .. }));
    }

    #[test]
    fn deactivate_interrupts_long_delay() {
        let engine =
            ScriptedEngine::new(vec![ScriptStep::new(60_000, EngineEvent::Result(ResultEvent::default()))])
                .expect("valid script");
        let recorder = Arc::new(Recorder::default());

        engine
            .activate(&ActivationRequest::new("en-US"), sink_for(&recorder, 1))
            .expect("activate");
        engine.deactivate(1);
        engine.deactivate(1);

        let events = wait_for_end(&recorder);
        assert_eq!(events, vec![EngineEvent::End]);
    }

    #[test]
    fn deactivate_for_earlier_activation_leaves_playback_running() {
        let engine = ScriptedEngine::new(vec![
            ScriptStep::new(150, EngineEvent::Result(ResultEvent::new(vec![
                RecognitionResult::finalized("still here"),
            ]))),
            ScriptStep::new(0, EngineEvent::End),
        ])
        .expect("valid script");
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());

        engine
            .activate(&ActivationRequest::new("en-US"), sink_for(&first, 1))
            .expect("activate first");
        engine
            .activate(&ActivationRequest::new("en-US"), sink_for(&second, 2))
            .expect("activate second");
        engine.deactivate(1);

        let events = wait_for_end(&second);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], EngineEvent::Result(_)));
        assert_eq!(wait_for_end(&first), vec![EngineEvent::End]);
    }
}
