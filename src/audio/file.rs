use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::sync::mpsc;
use tracing::{error, info};

use crate::audio::decode;
use crate::audio::frame::{Frame, SAMPLE_RATE};
use crate::audio::gain::GainControl;
use crate::audio::source::{FrameSource, SourceConfig};
use crate::error::{PipelineError, Result};

/// File-backed frame source.
///
/// Normalizes the whole file up front (so decode errors abort before any
/// recognition work), then a feeder thread pushes fixed-size blocks through
/// the same bounded channel the live path uses. Unlike the capture callback
/// the feeder is allowed to block on a full channel; end-of-file closes the
/// channel.
pub struct FileSource {
    path: PathBuf,
    gain: Arc<GainControl>,
    config: SourceConfig,
    feeder: Option<JoinHandle<()>>,
}

impl FileSource {
    pub fn new(path: PathBuf, gain: Arc<GainControl>, config: SourceConfig) -> Self {
        Self {
            path,
            gain,
            config,
            feeder: None,
        }
    }
}

#[async_trait::async_trait]
impl FrameSource for FileSource {
    async fn start(&mut self) -> Result<mpsc::Receiver<Frame>> {
        let path = self.path.clone();
        let samples = tokio::task::spawn_blocking(move || decode::normalize(&path))
            .await
            .map_err(|e| {
                PipelineError::decode(&self.path, format!("decode task failed: {e}"))
            })??;

        info!(
            "File source ready: {} ({:.1}s of audio)",
            self.path.display(),
            samples.len() as f64 / SAMPLE_RATE as f64
        );

        let (frame_tx, frame_rx) = mpsc::channel(self.config.channel_capacity);
        let gain = Arc::clone(&self.gain);
        let block_samples = self.config.block_samples;

        let feeder = std::thread::Builder::new()
            .name("voxscribe-file-feed".into())
            .spawn(move || {
                let mut sent_samples: u64 = 0;
                for chunk in samples.chunks(block_samples) {
                    let mut block = chunk.to_vec();
                    // Gain parity with live capture, re-read per block so
                    // adjustments land mid-run.
                    gain.apply(&mut block);

                    let frame = Frame {
                        samples: block,
                        timestamp_ms: sent_samples * 1_000 / SAMPLE_RATE as u64,
                    };
                    sent_samples += chunk.len() as u64;

                    if frame_tx.blocking_send(frame).is_err() {
                        // Consumer went away; nothing left to feed.
                        return;
                    }
                }
                // Dropping the sender here is the end-of-stream signal.
            })
            .map_err(|e| {
                PipelineError::Device(format!("failed to spawn file feeder: {e}"))
            })?;

        self.feeder = Some(feeder);
        Ok(frame_rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(feeder) = self.feeder.take() {
            if feeder.join().is_err() {
                error!("File feeder thread panicked");
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "file"
    }
}
