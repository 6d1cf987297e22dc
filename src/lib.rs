//! voxscribe: live and file speech transcription.
//!
//! Audio frames flow from a capture device or a decoded file through a
//! bounded channel into a stateful speech engine; finalized utterances are
//! persisted line-by-line and mirrored on a live feed. A `SessionController`
//! owns the lifecycle; the HTTP surface and the CLI are thin shells over it.

pub mod audio;
pub mod config;
pub mod error;
pub mod http;
pub mod session;
pub mod stt;
pub mod transcript;

pub use audio::{
    DefaultSourceFactory, Frame, FrameSource, GainControl, SourceConfig, SourceFactory,
    SourceMode,
};
pub use config::Config;
pub use error::{PipelineError, Result};
pub use http::{create_router, AppState};
pub use session::{
    ControllerState, FileRunReport, SessionConfig, SessionController, SessionStats,
};
pub use stt::{EngineFactory, Recognition, SpeechEngine};
pub use transcript::{TranscriptSegment, TranscriptSink};
