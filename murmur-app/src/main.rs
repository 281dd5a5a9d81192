//! Murmur: terminal host for the dictation session controller.
//!
//! Replays an engine script (or a built-in demo) through a
//! `DictationController` and prints transcript and status changes as they
//! are published.
//!
//! ```text
//! murmur [--script FILE] [--language TAG] [--append] [--sessions N]
//!        [--settings FILE] [--save-settings] [--no-engine]
//! ```

mod settings;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use murmur_core::{
    DictationController, EngineProvider, ScriptedEngine, SessionStatus, StaticProvider,
    UnavailableProvider,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::settings::{default_settings_path, load_settings, save_settings, AppSettings};

const DEMO_SCRIPT: &str = r#"[
  {"delayMs": 150, "event": {"type": "result", "results": [
    {"isFinal": false, "alternatives": [{"text": "turn"}]}]}},
  {"delayMs": 150, "event": {"type": "result", "results": [
    {"isFinal": false, "alternatives": [{"text": "turn left"}]}]}},
  {"delayMs": 200, "event": {"type": "result", "results": [
    {"isFinal": true, "alternatives": [{"text": "turn left here", "confidence": 0.93}]}]}},
  {"delayMs": 300, "event": {"type": "result", "results": [
    {"isFinal": false, "alternatives": [{"text": "then straight"}]}]}},
  {"delayMs": 200, "event": {"type": "result", "results": [
    {"isFinal": true, "alternatives": [{"text": "then straight on", "confidence": 0.88}]}]}}
]"#;

#[derive(Debug, Default)]
struct Args {
    script: Option<PathBuf>,
    language: Option<String>,
    append: bool,
    sessions: usize,
    settings: Option<PathBuf>,
    save_settings: bool,
    no_engine: bool,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        sessions: 1,
        ..Args::default()
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--script" => args.script = Some(iter.next().context("--script needs a path")?.into()),
            "--language" => args.language = Some(iter.next().context("--language needs a tag")?),
            "--append" => args.append = true,
            "--sessions" => {
                let raw = iter.next().context("--sessions needs a count")?;
                args.sessions = raw
                    .parse()
                    .with_context(|| format!("invalid session count '{raw}'"))?;
            }
            "--settings" => {
                args.settings = Some(iter.next().context("--settings needs a path")?.into())
            }
            "--save-settings" => args.save_settings = true,
            "--no-engine" => args.no_engine = true,
            other => bail!("unknown argument '{other}'"),
        }
    }
    if args.sessions == 0 {
        bail!("--sessions must be at least 1");
    }
    Ok(args)
}

fn resolve_settings(args: &Args) -> Result<AppSettings> {
    let path = args.settings.clone().unwrap_or_else(default_settings_path);
    let mut settings = load_settings(&path);
    settings.apply_env_overrides();

    if let Some(language) = &args.language {
        settings.language_tag = language.clone();
    }
    if args.append {
        settings.append_mode = true;
    }
    if let Some(script) = &args.script {
        settings.script_path = Some(script.clone());
    }
    settings.normalize();

    if args.save_settings {
        save_settings(&path, &settings)
            .with_context(|| format!("failed to save settings to {}", path.display()))?;
        info!("settings saved to {}", path.display());
    }
    Ok(settings)
}

fn build_provider(args: &Args, settings: &AppSettings) -> Result<Box<dyn EngineProvider>> {
    if args.no_engine {
        return Ok(Box::new(UnavailableProvider));
    }
    let engine = match &settings.script_path {
        Some(path) => ScriptedEngine::from_path(path)
            .with_context(|| format!("failed to load engine script {}", path.display()))?,
        None => ScriptedEngine::from_json(DEMO_SCRIPT).context("built-in demo script")?,
    };
    Ok(Box::new(StaticProvider::new(engine)))
}

/// Run one start → End cycle, printing every published change.
async fn run_session(controller: &DictationController, index: usize) -> Result<()> {
    let mut transcripts = controller.subscribe_transcripts();
    let mut statuses = controller.subscribe_status();

    controller.start();
    if !controller.is_recording() {
        if let Some(error) = controller.error() {
            println!("[session {index}] error: {error}");
        }
        println!("[session {index}] {}", controller.status());
        return Ok(());
    }
    println!("[session {index}] recording");

    loop {
        tokio::select! {
            ev = transcripts.recv() => match ev {
                Ok(ev) => println!("[session {index}] {}", ev.transcript),
                Err(RecvError::Lagged(n)) => warn!("transcript receiver lagged by {n} events"),
                Err(RecvError::Closed) => bail!("transcript channel closed"),
            },
            ev = statuses.recv() => match ev {
                Ok(ev) if ev.status != SessionStatus::Recording => {
                    if let Some(error) = ev.error {
                        println!("[session {index}] error: {error}");
                    }
                    println!("[session {index}] {}", ev.status);
                    return Ok(());
                }
                Ok(_) => {}
                Err(RecvError::Lagged(n)) => warn!("status receiver lagged by {n} events"),
                Err(RecvError::Closed) => bail!("status channel closed"),
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // ── Tracing ───────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("murmur=info,murmur_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args()?;
    let settings = resolve_settings(&args)?;
    info!(
        language = %settings.language_tag,
        append_mode = settings.append_mode,
        "murmur starting"
    );

    let provider = build_provider(&args, &settings)?;
    let controller = DictationController::new(settings.controller_config(), provider.as_ref());

    if !controller.is_supported() {
        controller.start();
        println!("error: {}", controller.error().unwrap_or_default());
        return Ok(());
    }

    for index in 1..=args.sessions {
        run_session(&controller, index).await?;
    }

    println!("transcript: {}", controller.transcript());
    if let Some(error) = controller.error() {
        println!("last error: {error}");
    }
    Ok(())
}
