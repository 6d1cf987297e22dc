use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::audio::capture::MicSource;
use crate::audio::file::FileSource;
use crate::audio::frame::{Frame, BLOCK_SAMPLES};
use crate::audio::gain::GainControl;
use crate::error::Result;

/// Where a session's audio comes from.
#[derive(Debug, Clone)]
pub enum SourceMode {
    /// Live capture from the default input device
    Microphone,
    /// Decoded audio file, drained to end-of-stream
    File(PathBuf),
}

/// Configuration shared by all frame sources.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Samples per emitted frame
    pub block_samples: usize,
    /// Bounded channel capacity, in frames. Sized so the live capture
    /// callback never meets a full channel in practice.
    pub channel_capacity: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            block_samples: BLOCK_SAMPLES,
            channel_capacity: 64, // 16 seconds of backlog at 250ms frames
        }
    }
}

/// Producer half of the session pipeline.
///
/// `start` hands back the bounded frame channel; the source owns whatever
/// thread produces into it. Frames arrive gain-scaled and in canonical
/// format. End-of-stream is signalled by closing the channel.
#[async_trait::async_trait]
pub trait FrameSource: Send {
    /// Begin producing frames.
    ///
    /// File sources normalize their input here, so a decode failure surfaces
    /// before a single frame is produced.
    async fn start(&mut self) -> Result<mpsc::Receiver<Frame>>;

    /// Tear the producer down. Reports any capture error recorded while the
    /// stream was live.
    async fn stop(&mut self) -> Result<()>;

    /// Source name for logging
    fn name(&self) -> &str;
}

/// Creates frame sources for the controller.
///
/// The controller only ever talks to this seam, which is also where tests
/// substitute scripted sources.
pub trait SourceFactory: Send + Sync {
    fn create(
        &self,
        mode: SourceMode,
        gain: Arc<GainControl>,
        config: SourceConfig,
    ) -> Result<Box<dyn FrameSource>>;
}

/// Factory wiring the real device and file sources.
pub struct DefaultSourceFactory;

impl SourceFactory for DefaultSourceFactory {
    fn create(
        &self,
        mode: SourceMode,
        gain: Arc<GainControl>,
        config: SourceConfig,
    ) -> Result<Box<dyn FrameSource>> {
        match mode {
            SourceMode::Microphone => Ok(Box::new(MicSource::new(gain, config))),
            SourceMode::File(path) => Ok(Box::new(FileSource::new(path, gain, config))),
        }
    }
}
