use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

use super::config::SessionConfig;
use super::pipeline;
use super::stats::{FileRunReport, SessionStats};
use crate::audio::{
    DefaultSourceFactory, FrameSource, GainControl, SourceFactory, SourceMode,
};
use crate::error::{PipelineError, Result};
use crate::stt::{EngineFactory, SpeechEngine};
use crate::transcript::{TranscriptSegment, TranscriptSink};

/// Controller lifecycle states. Live and file paths are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerState {
    Idle,
    Recording,
    Stopping,
    FileProcessing,
}

impl std::fmt::Display for ControllerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ControllerState::Idle => "idle",
            ControllerState::Recording => "recording",
            ControllerState::Stopping => "stopping",
            ControllerState::FileProcessing => "processing a file",
        };
        f.write_str(name)
    }
}

/// Orchestrates transcription sessions.
///
/// Owns the state machine (`Idle → Recording → Stopping → Idle` live,
/// `Idle → FileProcessing → Idle` file), the active session's worker and
/// source, the shared gain cell and the live transcript feed. Every
/// session-scoped failure is caught here: the controller returns to Idle,
/// keeps whatever transcript content was already written, and records the
/// error for status reporting.
pub struct SessionController {
    config: SessionConfig,
    engines: Arc<dyn EngineFactory>,
    sources: Arc<dyn SourceFactory>,

    state: Arc<StdMutex<ControllerState>>,
    stop_flag: Arc<AtomicBool>,
    gain: Arc<GainControl>,

    /// Live display feed: finalized segments of the active session, in order
    feed: Arc<StdMutex<Vec<TranscriptSegment>>>,
    live_partial: Arc<StdMutex<Option<String>>>,
    frames_processed: Arc<AtomicUsize>,
    last_error: Arc<StdMutex<Option<String>>>,

    session_id: StdMutex<Option<String>>,
    started_at: StdMutex<Option<DateTime<Utc>>>,
    transcript_path: StdMutex<Option<PathBuf>>,

    worker: Mutex<Option<JoinHandle<()>>>,
    active_source: Mutex<Option<Box<dyn FrameSource>>>,

    /// Engine reused across sequential file runs; reset before each run.
    /// Live sessions always get a fresh instance so a concurrent file run
    /// never shares decoding state with them.
    file_engine: Mutex<Option<Box<dyn SpeechEngine>>>,
}

impl SessionController {
    pub fn new(
        config: SessionConfig,
        engines: Arc<dyn EngineFactory>,
        sources: Arc<dyn SourceFactory>,
    ) -> Self {
        let gain = Arc::new(GainControl::new(config.initial_gain));
        Self {
            config,
            engines,
            sources,
            state: Arc::new(StdMutex::new(ControllerState::Idle)),
            stop_flag: Arc::new(AtomicBool::new(false)),
            gain,
            feed: Arc::new(StdMutex::new(Vec::new())),
            live_partial: Arc::new(StdMutex::new(None)),
            frames_processed: Arc::new(AtomicUsize::new(0)),
            last_error: Arc::new(StdMutex::new(None)),
            session_id: StdMutex::new(None),
            started_at: StdMutex::new(None),
            transcript_path: StdMutex::new(None),
            worker: Mutex::new(None),
            active_source: Mutex::new(None),
            file_engine: Mutex::new(None),
        }
    }

    /// Controller wired to the real microphone and file sources.
    pub fn with_default_sources(config: SessionConfig, engines: Arc<dyn EngineFactory>) -> Self {
        Self::new(config, engines, Arc::new(DefaultSourceFactory))
    }

    pub fn state(&self) -> ControllerState {
        *self.state.lock().unwrap()
    }

    /// Adjust gain. Valid in any state: the atomic cell is read by whichever
    /// frame source is active now, or by the next one.
    pub fn set_gain(&self, gain: f32) {
        self.gain.set(gain);
        info!("Gain set to {:.2}", self.gain.get());
    }

    pub fn gain(&self) -> f32 {
        self.gain.get()
    }

    /// Start a live capture session. Idle → Recording.
    ///
    /// Returns the path of the transcript artifact the session writes.
    pub async fn start(&self) -> Result<PathBuf> {
        self.transition_from_idle(ControllerState::Recording, "start recording")?;

        match self.start_inner().await {
            Ok(path) => Ok(path),
            Err(e) => {
                self.record_error(&e);
                *self.state.lock().unwrap() = ControllerState::Idle;
                Err(e)
            }
        }
    }

    async fn start_inner(&self) -> Result<PathBuf> {
        // Reap a source left behind by a worker that ended on its own
        // (capture failure); harmless when none exists.
        if let Some(mut stale) = self.active_source.lock().await.take() {
            let _ = stale.stop().await;
        }

        let session_id = format!("session-{}", Uuid::new_v4());
        info!("Starting live session {}", session_id);
        self.reset_session_state(&session_id);
        self.stop_flag.store(false, Ordering::SeqCst);

        let engine = self.engines.new_engine()?;
        let mut source = self.sources.create(
            SourceMode::Microphone,
            Arc::clone(&self.gain),
            self.config.source.clone(),
        )?;
        let frames = source.start().await?;
        let sink = TranscriptSink::create(&self.config.output_dir, Arc::clone(&self.feed))?;
        let artifact = sink.path().to_path_buf();

        *self.transcript_path.lock().unwrap() = Some(artifact.clone());
        *self.active_source.lock().await = Some(source);

        let stop = Arc::clone(&self.stop_flag);
        let state = Arc::clone(&self.state);
        let frames_processed = Arc::clone(&self.frames_processed);
        let live_partial = Arc::clone(&self.live_partial);
        let last_error = Arc::clone(&self.last_error);

        let worker = tokio::task::spawn_blocking(move || {
            let mut engine = engine;
            let mut sink = sink;
            let result = pipeline::drain(
                frames,
                engine.as_mut(),
                &mut sink,
                &stop,
                &frames_processed,
                &live_partial,
            );

            match result {
                Ok(summary) => {
                    if let Err(e) = sink.close() {
                        error!("Failed to close transcript: {}", e);
                        *last_error.lock().unwrap() = Some(e.to_string());
                    }
                    info!(
                        "Live session finished: {} finalized segments",
                        summary.finals_emitted
                    );
                }
                Err(e) => {
                    // Partial transcript content stays on disk; the sink's
                    // Drop releases the handle.
                    error!("Live session aborted: {}", e);
                    *last_error.lock().unwrap() = Some(e.to_string());
                }
            }

            *state.lock().unwrap() = ControllerState::Idle;
        });
        *self.worker.lock().await = Some(worker);

        info!("Recording started, transcript at {}", artifact.display());
        Ok(artifact)
    }

    /// Stop the live session. Recording → Stopping → Idle.
    ///
    /// Raises the stop flag, closes the frame channel by stopping the source,
    /// then joins the worker — which flushes the engine and closes the sink
    /// before the state returns to Idle. Rejected while Idle; state unchanged.
    pub async fn stop(&self) -> Result<SessionStats> {
        {
            let mut state = self.state.lock().unwrap();
            match *state {
                ControllerState::Recording => *state = ControllerState::Stopping,
                other => {
                    return Err(PipelineError::InvalidState(format!(
                        "cannot stop: controller is {}",
                        other
                    )))
                }
            }
        }

        info!("Stop requested");
        self.stop_flag.store(true, Ordering::SeqCst);

        // Closing the source drops the frame sender, so a worker blocked on
        // an empty channel wakes immediately instead of waiting for a frame.
        let source_result = match self.active_source.lock().await.take() {
            Some(mut source) => source.stop().await,
            None => Ok(()),
        };
        if let Err(e) = &source_result {
            self.record_error(e);
        }

        if let Some(worker) = self.worker.lock().await.take() {
            if let Err(e) = worker.await {
                error!("Session worker panicked: {}", e);
            }
        }
        *self.state.lock().unwrap() = ControllerState::Idle;

        info!("Recording session stopped");
        source_result?;
        Ok(self.status())
    }

    /// Transcribe a file to completion. Idle → FileProcessing → Idle.
    ///
    /// Not cancellable; rejected while a live session is active, leaving that
    /// session untouched.
    pub async fn run_file(&self, path: PathBuf) -> Result<FileRunReport> {
        self.transition_from_idle(ControllerState::FileProcessing, "process a file")?;

        let outcome = self.run_file_inner(path).await;
        if let Err(e) = &outcome {
            self.record_error(e);
        }
        *self.state.lock().unwrap() = ControllerState::Idle;
        outcome
    }

    async fn run_file_inner(&self, path: PathBuf) -> Result<FileRunReport> {
        let session_id = format!("session-{}", Uuid::new_v4());
        info!("Starting file session {} for {}", session_id, path.display());
        self.reset_session_state(&session_id);

        // Sequential file runs reuse one engine instance; reset clears the
        // previous run's decoding state before any frame is fed.
        let mut engine = match self.file_engine.lock().await.take() {
            Some(engine) => engine,
            None => self.engines.new_engine()?,
        };
        engine.reset();

        let mut source = self.sources.create(
            SourceMode::File(path),
            Arc::clone(&self.gain),
            self.config.source.clone(),
        )?;
        // Decode failures surface here, before any recognition work.
        let frames = match source.start().await {
            Ok(frames) => frames,
            Err(e) => {
                *self.file_engine.lock().await = Some(engine);
                return Err(e);
            }
        };

        let mut sink = TranscriptSink::create(&self.config.output_dir, Arc::clone(&self.feed))?;
        *self.transcript_path.lock().unwrap() = Some(sink.path().to_path_buf());

        let frames_processed = Arc::clone(&self.frames_processed);
        let live_partial = Arc::clone(&self.live_partial);

        let (engine, close_result, drain_result) = tokio::task::spawn_blocking(move || {
            let mut engine = engine;
            let mut sink = sink;
            // File runs are not cancellable: the flag never rises.
            let stop = AtomicBool::new(false);
            let result = pipeline::drain(
                frames,
                engine.as_mut(),
                &mut sink,
                &stop,
                &frames_processed,
                &live_partial,
            );
            let close = sink.close();
            (engine, close, result)
        })
        .await
        .map_err(|e| PipelineError::Engine(format!("session worker failed: {e}")))?;

        *self.file_engine.lock().await = Some(engine);
        let source_result = source.stop().await;

        let summary = drain_result?;
        let artifact = close_result?;
        source_result?;

        let segments = self.feed.lock().unwrap().clone();
        info!(
            "File session finished: {} finalized segments, transcript at {}",
            segments.len(),
            artifact.display()
        );

        Ok(FileRunReport {
            session_id,
            transcript_path: artifact.display().to_string(),
            segments,
            frames_processed: summary.frames_processed,
        })
    }

    /// Finalized segments of the active (or most recent) session, in order.
    pub fn transcript(&self) -> Vec<TranscriptSegment> {
        self.feed.lock().unwrap().clone()
    }

    pub fn status(&self) -> SessionStats {
        SessionStats {
            state: self.state(),
            session_id: self.session_id.lock().unwrap().clone(),
            started_at: *self.started_at.lock().unwrap(),
            gain: self.gain.get(),
            frames_processed: self.frames_processed.load(Ordering::Relaxed),
            segments: self.feed.lock().unwrap().len(),
            transcript_path: self
                .transcript_path
                .lock()
                .unwrap()
                .as_ref()
                .map(|p| p.display().to_string()),
            live_partial: self.live_partial.lock().unwrap().clone(),
            last_error: self.last_error.lock().unwrap().clone(),
        }
    }

    fn transition_from_idle(&self, to: ControllerState, action: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        match *state {
            ControllerState::Idle => {
                *state = to;
                Ok(())
            }
            other => Err(PipelineError::InvalidState(format!(
                "cannot {action}: controller is {other}"
            ))),
        }
    }

    fn reset_session_state(&self, session_id: &str) {
        *self.session_id.lock().unwrap() = Some(session_id.to_string());
        *self.started_at.lock().unwrap() = Some(Utc::now());
        *self.last_error.lock().unwrap() = None;
        *self.live_partial.lock().unwrap() = None;
        self.frames_processed.store(0, Ordering::Relaxed);
        self.feed.lock().unwrap().clear();
    }

    fn record_error(&self, error: &PipelineError) {
        *self.last_error.lock().unwrap() = Some(error.to_string());
    }
}
