//! Speech-to-text abstraction and the optional engine implementation
//! (feature-gated, since the native library is not always present).

use crate::error::Result;

#[cfg(feature = "vosk")]
pub mod vosk;

#[cfg(feature = "vosk")]
pub use vosk::VoskEngineFactory;

/// Output of one engine call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recognition {
    /// Utterance still in progress. Partial text, when present, is
    /// low-confidence and must never be persisted.
    Partial(Option<String>),
    /// Utterance boundary reached; the text is terminal and ordered. Empty
    /// text is normal for silence.
    Final(String),
}

impl Recognition {
    /// Final text carried by this result, if any.
    pub fn final_text(&self) -> Option<&str> {
        match self {
            Recognition::Final(text) => Some(text),
            Recognition::Partial(_) => None,
        }
    }
}

/// One stateful recognizer instance.
///
/// The engine accumulates acoustic state across `accept_frame` calls, so
/// calls are strictly sequential: at most one frame in flight per instance,
/// and concurrently active sessions each get their own instance from the
/// factory.
pub trait SpeechEngine: Send {
    /// Feed one canonical-format frame (16kHz mono i16 PCM).
    fn accept_frame(&mut self, samples: &[i16]) -> Result<Recognition>;

    /// Force-emit whatever utterance is still buffered. Called exactly once,
    /// at end-of-stream, after the last `accept_frame`.
    fn flush(&mut self) -> Result<Recognition>;

    /// Clear decoding state. Required before reusing an instance for a new
    /// run, otherwise the previous session's lattice bleeds through.
    fn reset(&mut self);
}

/// Creates engine instances against a model loaded once per process.
pub trait EngineFactory: Send + Sync {
    fn new_engine(&self) -> Result<Box<dyn SpeechEngine>>;

    /// Engine name for logging
    fn name(&self) -> &str;
}
