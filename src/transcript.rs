use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{PipelineError, Result};

/// One finalized utterance on the live display feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Finalized text, exactly as persisted
    pub text: String,
    /// When the segment was appended
    pub timestamp: DateTime<Utc>,
}

/// Serializes finalized text to the session artifact and the live feed.
///
/// One sink per session. Appends preserve receipt order on both outputs; each
/// line is flushed as it lands so an aborted session keeps everything written
/// so far. The handle is released exactly once: on `close`, or by the Drop
/// guard on abnormal exit paths.
pub struct TranscriptSink {
    writer: Option<BufWriter<File>>,
    path: PathBuf,
    feed: Arc<Mutex<Vec<TranscriptSegment>>>,
}

impl TranscriptSink {
    /// Create the timestamp-named artifact in `output_dir`.
    pub fn create(
        output_dir: &Path,
        feed: Arc<Mutex<Vec<TranscriptSegment>>>,
    ) -> Result<Self> {
        fs::create_dir_all(output_dir)?;

        let filename = Local::now()
            .format("transcription_%Y-%m-%d_%H-%M-%S.txt")
            .to_string();
        let path = output_dir.join(filename);
        let file = File::create(&path)?;

        info!("Transcript artifact created: {}", path.display());
        Ok(Self {
            writer: Some(BufWriter::new(file)),
            path,
            feed,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one finalized utterance: text plus line terminator to the
    /// artifact, the same text in the same order onto the feed.
    pub fn append(&mut self, text: &str) -> Result<()> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            PipelineError::InvalidState("transcript already closed".into())
        })?;
        writer.write_all(text.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        self.feed.lock().unwrap().push(TranscriptSegment {
            text: text.to_string(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Flush and release the file handle.
    pub fn close(mut self) -> Result<PathBuf> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(self.path.clone())
    }
}

impl Drop for TranscriptSink {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.flush() {
                warn!("Failed to flush transcript on drop: {}", e);
            }
        }
    }
}
