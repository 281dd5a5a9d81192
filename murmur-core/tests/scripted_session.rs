use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use murmur_core::{
    ControllerConfig, DictationController, EngineEvent, RecognitionResult, ResultEvent,
    ScriptStep, ScriptedEngine, SessionStatus, SessionStatusEvent, StaticProvider,
};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

fn recv_status_with_timeout(
    rx: &mut broadcast::Receiver<SessionStatusEvent>,
    timeout: Duration,
    wanted: SessionStatus,
) -> SessionStatusEvent {
    let start = Instant::now();
    loop {
        match rx.try_recv() {
            Ok(ev) if ev.status == wanted => return ev,
            Ok(_) => continue,
            Err(TryRecvError::Empty) => {
                if start.elapsed() >= timeout {
                    panic!("timed out waiting for {wanted} status");
                }
                thread::sleep(Duration::from_millis(5));
            }
            Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Closed) => panic!("status channel closed unexpectedly"),
        }
    }
}

fn results(delay_ms: u64, results: Vec<RecognitionResult>) -> ScriptStep {
    ScriptStep::new(delay_ms, EngineEvent::Result(ResultEvent::new(results)))
}

#[test]
fn scripted_utterance_ends_on_its_own() {
    let engine = Arc::new(
        ScriptedEngine::new(vec![
            results(5, vec![RecognitionResult::interim("turn")]),
            results(5, vec![RecognitionResult::interim("turn left")]),
            results(5, vec![RecognitionResult::finalized("turn left here")]),
        ])
        .expect("valid script"),
    );
    let controller = DictationController::new(
        ControllerConfig::default(),
        &StaticProvider::from_arc(engine.clone()),
    );
    let mut status_rx = controller.subscribe_status();

    controller.start();
    recv_status_with_timeout(&mut status_rx, Duration::from_secs(2), SessionStatus::Ended);

    assert_eq!(controller.transcript(), "turn left here");
    assert_eq!(controller.interim_text(), "");
    assert_eq!(controller.error(), None);
    assert_eq!(engine.activation_count(), 1);
}

#[test]
fn stop_interrupts_scripted_playback() {
    let engine = Arc::new(
        ScriptedEngine::new(vec![
            results(0, vec![RecognitionResult::finalized("quick")]),
            results(60_000, vec![RecognitionResult::finalized("never delivered")]),
        ])
        .expect("valid script"),
    );
    let controller = DictationController::new(
        ControllerConfig::default(),
        &StaticProvider::from_arc(engine.clone()),
    );
    let mut transcript_rx = controller.subscribe_transcripts();

    controller.start();

    let start = Instant::now();
    loop {
        match transcript_rx.try_recv() {
            Ok(ev) if ev.transcript == "quick" => break,
            Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty) => {
                assert!(start.elapsed() < Duration::from_secs(2), "no transcript");
                thread::sleep(Duration::from_millis(5));
            }
            Err(TryRecvError::Closed) => panic!("transcript channel closed"),
        }
    }

    controller.stop();
    assert_eq!(controller.status(), SessionStatus::Ended);
    assert_eq!(controller.transcript(), "quick");
}

#[test]
fn scripted_permission_error_surfaces_message() {
    let engine = ScriptedEngine::from_json(
        r#"[
            {"delayMs": 1, "event": {"type": "result", "results": [
                {"isFinal": true, "alternatives": [{"text": "hello"}]}
            ]}},
            {"delayMs": 1, "event": {"type": "error", "code": "not-allowed"}}
        ]"#,
    )
    .expect("valid script");
    let controller = DictationController::new(
        ControllerConfig::default().with_host_label("browser"),
        &StaticProvider::new(engine),
    );
    let mut status_rx = controller.subscribe_status();

    controller.start();
    let ended =
        recv_status_with_timeout(&mut status_rx, Duration::from_secs(2), SessionStatus::Ended);

    assert!(ended
        .error
        .as_deref()
        .is_some_and(|msg| msg.contains("browser settings")));
    assert_eq!(controller.transcript(), "hello");
}
