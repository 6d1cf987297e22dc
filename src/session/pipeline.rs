use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::info;

use crate::audio::Frame;
use crate::error::Result;
use crate::stt::{Recognition, SpeechEngine};
use crate::transcript::TranscriptSink;

/// What a finished drain loop reports back.
#[derive(Debug, Clone, Copy)]
pub struct PipelineSummary {
    pub frames_processed: usize,
    pub finals_emitted: usize,
}

/// Consume the frame channel through the engine into the sink.
///
/// This is the session worker's whole job, and it blocks: the only suspension
/// point is the channel receive. Frames are consumed in production order and
/// fed to the engine one at a time; finalized text is appended in the same
/// order it is produced. The stop flag is checked once per iteration (between
/// frames, never mid-frame), so a stop request costs at most one frame of
/// latency. On stop or end-of-stream the engine is flushed exactly once,
/// after the last accept, to capture any trailing unflushed utterance.
///
/// Empty final texts (silence) are discarded; `live_partial` mirrors the
/// in-progress utterance for display and is never persisted.
pub fn drain(
    mut frames: mpsc::Receiver<Frame>,
    engine: &mut dyn SpeechEngine,
    sink: &mut TranscriptSink,
    stop: &AtomicBool,
    frames_processed: &AtomicUsize,
    live_partial: &Mutex<Option<String>>,
) -> Result<PipelineSummary> {
    let mut consumed = 0usize;
    let mut finals = 0usize;

    while !stop.load(Ordering::SeqCst) {
        let Some(frame) = frames.blocking_recv() else {
            break;
        };
        consumed += 1;
        frames_processed.store(consumed, Ordering::Relaxed);

        match engine.accept_frame(&frame.samples)? {
            Recognition::Final(text) => {
                *live_partial.lock().unwrap() = None;
                let text = text.trim();
                if !text.is_empty() {
                    sink.append(text)?;
                    finals += 1;
                }
            }
            Recognition::Partial(partial) => {
                *live_partial.lock().unwrap() = partial;
            }
        }
    }

    let flushed = engine.flush()?;
    *live_partial.lock().unwrap() = None;
    if let Some(text) = flushed.final_text() {
        let text = text.trim();
        if !text.is_empty() {
            sink.append(text)?;
            finals += 1;
        }
    }

    info!(
        "Pipeline drained: {} frames, {} finalized segments",
        consumed, finals
    );
    Ok(PipelineSummary {
        frames_processed: consumed,
        finals_emitted: finals,
    })
}
