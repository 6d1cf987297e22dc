// Integration tests for the session controller state machine
//
// Scripted engines and sources are injected through the factory seams, so
// these cover the full start/stop/file-run lifecycle without a microphone or
// a speech model.

mod common;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use common::{
    silent_frame, ScriptedEngine, ScriptedEngineFactory, ScriptedSource,
    ScriptedSourceFactory, wait_until,
};
use tempfile::TempDir;
use voxscribe::{
    ControllerState, PipelineError, Recognition, SessionConfig, SessionController,
};

fn test_config(output_dir: &TempDir) -> SessionConfig {
    SessionConfig {
        output_dir: output_dir.path().to_path_buf(),
        ..SessionConfig::default()
    }
}

#[tokio::test]
async fn test_stop_while_idle_is_rejected_and_changes_nothing() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let controller = SessionController::new(
        test_config(&temp_dir),
        ScriptedEngineFactory::new(Vec::new()),
        ScriptedSourceFactory::new(Vec::new()),
    );

    let result = controller.stop().await;

    assert!(matches!(result, Err(PipelineError::InvalidState(_))));
    assert_eq!(controller.state(), ControllerState::Idle);
    Ok(())
}

#[tokio::test]
async fn test_live_silence_session_leaves_empty_transcript() -> Result<()> {
    // start() -> three frames of silence -> stop(): the artifact exists with
    // zero non-empty lines and the controller ends Idle.
    let temp_dir = TempDir::new()?;
    let sources = ScriptedSourceFactory::new(vec![ScriptedSource::new(
        (0..3).map(silent_frame).collect(),
        true,
    )]);
    let controller = SessionController::new(
        test_config(&temp_dir),
        ScriptedEngineFactory::new(vec![ScriptedEngine::silence()]),
        sources,
    );

    let artifact = controller.start().await?;
    assert_eq!(controller.state(), ControllerState::Recording);

    wait_until("all frames consumed", || {
        controller.status().frames_processed == 3
    })
    .await;

    let stats = controller.stop().await?;
    assert_eq!(stats.state, ControllerState::Idle);
    assert_eq!(stats.frames_processed, 3);
    assert_eq!(stats.segments, 0, "silence finalizes no text");

    let content = fs::read_to_string(&artifact)?;
    assert!(
        content.lines().all(|l| l.trim().is_empty()),
        "no non-empty lines expected, got {content:?}"
    );
    Ok(())
}

#[tokio::test]
async fn test_second_start_is_rejected_while_recording() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let sources = ScriptedSourceFactory::new(vec![ScriptedSource::new(
        vec![silent_frame(0)],
        true,
    )]);
    let controller = SessionController::new(
        test_config(&temp_dir),
        ScriptedEngineFactory::new(Vec::new()),
        sources,
    );

    controller.start().await?;
    let second = controller.start().await;

    assert!(matches!(second, Err(PipelineError::InvalidState(_))));
    assert_eq!(controller.state(), ControllerState::Recording);

    controller.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_run_file_is_rejected_while_recording() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let sources = ScriptedSourceFactory::new(vec![ScriptedSource::new(
        vec![silent_frame(0)],
        true,
    )]);
    let controller = SessionController::new(
        test_config(&temp_dir),
        ScriptedEngineFactory::new(Vec::new()),
        sources,
    );

    let artifact = controller.start().await?;
    wait_until("frame consumed", || {
        controller.status().frames_processed == 1
    })
    .await;

    let rejected = controller.run_file(PathBuf::from("whatever.wav")).await;
    assert!(matches!(rejected, Err(PipelineError::InvalidState(_))));

    // The live session is untouched by the rejection
    assert_eq!(controller.state(), ControllerState::Recording);
    let stats = controller.stop().await?;
    assert_eq!(stats.state, ControllerState::Idle);
    assert!(artifact.exists());
    Ok(())
}

#[tokio::test]
async fn test_file_runs_reuse_one_engine_with_reset_between() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let engine = ScriptedEngine::new(
        vec![
            Ok(Recognition::Final("alpha".into())),
            Ok(Recognition::Final("beta".into())),
        ],
        "gamma",
    );
    let calls = engine.call_log();
    let engines = ScriptedEngineFactory::new(vec![engine]);
    let sources = ScriptedSourceFactory::new(vec![
        ScriptedSource::new((0..2).map(silent_frame).collect(), false),
        ScriptedSource::new(vec![silent_frame(0)], false),
    ]);
    let engines_factory: Arc<dyn voxscribe::EngineFactory> = engines.clone();
    let controller =
        SessionController::new(test_config(&temp_dir), engines_factory, sources);

    let first = controller.run_file(PathBuf::from("first.wav")).await?;
    let texts: Vec<&str> = first.segments.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(texts, vec!["alpha", "beta", "gamma"]);
    assert_eq!(first.frames_processed, 2);
    assert_eq!(controller.state(), ControllerState::Idle);

    let second = controller.run_file(PathBuf::from("second.wav")).await?;
    let texts: Vec<&str> = second.segments.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(texts, vec!["gamma"], "script exhausted, only the flush text remains");

    // One engine instance across sequential runs, reset before each
    assert_eq!(engines.engines_created(), 1);
    let calls = calls.lock().unwrap();
    assert_eq!(
        *calls,
        vec!["reset", "accept", "accept", "flush", "reset", "accept", "flush"]
    );

    // Each run produced its own artifact
    assert_ne!(first.transcript_path, second.transcript_path);
    assert!(PathBuf::from(&first.transcript_path).exists());
    Ok(())
}

#[tokio::test]
async fn test_decode_failure_returns_to_idle_with_error_recorded() -> Result<()> {
    let temp_dir = TempDir::new()?;
    // Real file source, so the decode failure is the genuine article
    let controller = SessionController::with_default_sources(
        test_config(&temp_dir),
        ScriptedEngineFactory::new(Vec::new()),
    );

    let result = controller
        .run_file(temp_dir.path().join("does-not-exist.wav"))
        .await;

    assert!(matches!(result, Err(PipelineError::Decode { .. })));
    assert_eq!(controller.state(), ControllerState::Idle);
    assert!(controller.status().last_error.is_some());
    Ok(())
}

#[tokio::test]
async fn test_zero_length_file_produces_empty_transcript() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let wav_path = temp_dir.path().join("empty.wav");
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    hound::WavWriter::create(&wav_path, spec)?.finalize()?;

    let controller = SessionController::with_default_sources(
        test_config(&temp_dir),
        ScriptedEngineFactory::new(Vec::new()),
    );

    let report = controller.run_file(wav_path).await?;

    assert_eq!(report.frames_processed, 0);
    assert!(report.segments.is_empty());
    let content = fs::read_to_string(&report.transcript_path)?;
    assert_eq!(content, "", "artifact is well-formed and empty");
    assert_eq!(controller.state(), ControllerState::Idle);
    Ok(())
}

#[tokio::test]
async fn test_set_gain_is_valid_in_any_state_and_clamped() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let sources = ScriptedSourceFactory::new(vec![ScriptedSource::new(
        vec![silent_frame(0)],
        true,
    )]);
    let controller = SessionController::new(
        test_config(&temp_dir),
        ScriptedEngineFactory::new(Vec::new()),
        sources,
    );

    controller.set_gain(5.0);
    assert_eq!(controller.gain(), 2.0, "gain saturates at 200%");

    controller.start().await?;
    controller.set_gain(0.5);
    assert_eq!(controller.gain(), 0.5);
    controller.stop().await?;

    controller.set_gain(-3.0);
    assert_eq!(controller.gain(), 0.0);
    Ok(())
}

#[tokio::test]
async fn test_status_serializes_for_the_shell() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let controller = SessionController::new(
        test_config(&temp_dir),
        ScriptedEngineFactory::new(Vec::new()),
        ScriptedSourceFactory::new(Vec::new()),
    );

    let json = serde_json::to_value(controller.status())?;

    assert_eq!(json["state"], "idle");
    assert_eq!(json["segments"], 0);
    assert!(json["last_error"].is_null());
    Ok(())
}
