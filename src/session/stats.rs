use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::controller::ControllerState;
use crate::transcript::TranscriptSegment;

/// Point-in-time view of the controller, for status reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Current lifecycle state
    pub state: ControllerState,

    /// Identifier of the active (or most recent) session
    pub session_id: Option<String>,

    /// When that session started
    pub started_at: Option<DateTime<Utc>>,

    /// Current gain setting (0.0 to 2.0)
    pub gain: f32,

    /// Frames consumed by the session worker so far
    pub frames_processed: usize,

    /// Finalized segments appended so far
    pub segments: usize,

    /// Artifact the session is writing (or last wrote)
    pub transcript_path: Option<String>,

    /// Low-confidence text for the utterance still in progress; never persisted
    pub live_partial: Option<String>,

    /// Most recent session-scoped error, if any
    pub last_error: Option<String>,
}

/// Outcome of a run-to-completion file session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRunReport {
    pub session_id: String,

    /// Artifact the finalized segments were persisted to
    pub transcript_path: String,

    /// Finalized segments, in production order
    pub segments: Vec<TranscriptSegment>,

    /// Frames fed to the engine
    pub frames_processed: usize,
}
