// Scripted doubles for the engine and source factory seams.
//
// The controller and pipeline are exercised end-to-end with these; only the
// real microphone and the real model stay out of the picture.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use voxscribe::audio::BLOCK_SAMPLES;
use voxscribe::{
    EngineFactory, Frame, FrameSource, GainControl, PipelineError, Recognition,
    SourceConfig, SourceFactory, SourceMode, SpeechEngine,
};

/// Engine that plays back scripted results and records its call sequence.
pub struct ScriptedEngine {
    responses: VecDeque<voxscribe::Result<Recognition>>,
    flush_text: String,
    pub calls: Arc<Mutex<Vec<&'static str>>>,
}

impl ScriptedEngine {
    /// Engine that never finalizes anything: silence in, silence out.
    pub fn silence() -> Self {
        Self::new(Vec::new(), "")
    }

    pub fn new(
        responses: Vec<voxscribe::Result<Recognition>>,
        flush_text: &str,
    ) -> Self {
        Self {
            responses: responses.into_iter().collect(),
            flush_text: flush_text.to_string(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn call_log(&self) -> Arc<Mutex<Vec<&'static str>>> {
        Arc::clone(&self.calls)
    }
}

impl SpeechEngine for ScriptedEngine {
    fn accept_frame(&mut self, _samples: &[i16]) -> voxscribe::Result<Recognition> {
        self.calls.lock().unwrap().push("accept");
        self.responses
            .pop_front()
            .unwrap_or(Ok(Recognition::Partial(None)))
    }

    fn flush(&mut self) -> voxscribe::Result<Recognition> {
        self.calls.lock().unwrap().push("flush");
        Ok(Recognition::Final(self.flush_text.clone()))
    }

    fn reset(&mut self) {
        self.calls.lock().unwrap().push("reset");
    }
}

/// Hands out pre-built engines in order; silence engines once exhausted.
pub struct ScriptedEngineFactory {
    engines: Mutex<VecDeque<ScriptedEngine>>,
    created: AtomicUsize,
}

impl ScriptedEngineFactory {
    pub fn new(engines: Vec<ScriptedEngine>) -> Arc<Self> {
        Arc::new(Self {
            engines: Mutex::new(engines.into_iter().collect()),
            created: AtomicUsize::new(0),
        })
    }

    pub fn engines_created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl EngineFactory for ScriptedEngineFactory {
    fn new_engine(&self) -> voxscribe::Result<Box<dyn SpeechEngine>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        let engine = self
            .engines
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(ScriptedEngine::silence);
        Ok(Box::new(engine))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Source that preloads its frames onto the channel.
///
/// With `hold_open` the sender stays alive after the preload, so the session
/// keeps running until the controller stops the source — the live-capture
/// shape. Without it the channel closes after the last frame — the file shape.
pub struct ScriptedSource {
    frames: Vec<Frame>,
    hold_open: bool,
    keeper: Option<mpsc::Sender<Frame>>,
}

impl ScriptedSource {
    pub fn new(frames: Vec<Frame>, hold_open: bool) -> Self {
        Self {
            frames,
            hold_open,
            keeper: None,
        }
    }
}

#[async_trait::async_trait]
impl FrameSource for ScriptedSource {
    async fn start(&mut self) -> voxscribe::Result<mpsc::Receiver<Frame>> {
        let (tx, rx) = mpsc::channel(self.frames.len() + 1);
        for frame in self.frames.drain(..) {
            tx.send(frame)
                .await
                .map_err(|_| PipelineError::Device("scripted channel closed".into()))?;
        }
        if self.hold_open {
            self.keeper = Some(tx);
        }
        Ok(rx)
    }

    async fn stop(&mut self) -> voxscribe::Result<()> {
        self.keeper = None;
        Ok(())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Hands out pre-built sources in order, whatever the requested mode.
pub struct ScriptedSourceFactory {
    sources: Mutex<VecDeque<ScriptedSource>>,
}

impl ScriptedSourceFactory {
    pub fn new(sources: Vec<ScriptedSource>) -> Arc<Self> {
        Arc::new(Self {
            sources: Mutex::new(sources.into_iter().collect()),
        })
    }
}

impl SourceFactory for ScriptedSourceFactory {
    fn create(
        &self,
        _mode: SourceMode,
        _gain: Arc<GainControl>,
        _config: SourceConfig,
    ) -> voxscribe::Result<Box<dyn FrameSource>> {
        let source = self
            .sources
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| PipelineError::Device("no scripted source left".into()))?;
        Ok(Box::new(source))
    }
}

/// One block of silence.
pub fn silent_frame(index: u64) -> Frame {
    Frame {
        samples: vec![0i16; BLOCK_SAMPLES],
        timestamp_ms: index * 250,
    }
}

/// Poll until `cond` holds, or panic after two seconds.
pub async fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}
