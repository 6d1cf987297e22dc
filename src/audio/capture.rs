use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleFormat, SampleRate, StreamConfig};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::audio::frame::{Frame, FrameAssembler, CHANNELS, SAMPLE_RATE};
use crate::audio::gain::GainControl;
use crate::audio::source::{FrameSource, SourceConfig};
use crate::error::{PipelineError, Result};

/// Live microphone source.
///
/// The cpal stream is opened at the canonical rate and channel count and owned
/// by a dedicated thread (cpal streams are not Send). The device callback only
/// scales gain, re-chunks into fixed blocks and try-sends onto the bounded
/// channel; a full channel drops the frame rather than ever blocking the
/// device thread.
pub struct MicSource {
    gain: Arc<GainControl>,
    config: SourceConfig,
    capture_thread: Option<JoinHandle<()>>,
    stop_tx: Option<std::sync::mpsc::Sender<()>>,
    capture_error: Arc<Mutex<Option<String>>>,
    dropped_frames: Arc<AtomicUsize>,
}

impl MicSource {
    pub fn new(gain: Arc<GainControl>, config: SourceConfig) -> Self {
        Self {
            gain,
            config,
            capture_thread: None,
            stop_tx: None,
            capture_error: Arc::new(Mutex::new(None)),
            dropped_frames: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait::async_trait]
impl FrameSource for MicSource {
    async fn start(&mut self) -> Result<mpsc::Receiver<Frame>> {
        let (frame_tx, frame_rx) = mpsc::channel(self.config.channel_capacity);
        let (stop_tx, stop_rx) = std::sync::mpsc::channel::<()>();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();

        let gain = Arc::clone(&self.gain);
        let block_samples = self.config.block_samples;
        let capture_error = Arc::clone(&self.capture_error);
        let dropped_frames = Arc::clone(&self.dropped_frames);

        let thread = std::thread::Builder::new()
            .name("voxscribe-capture".into())
            .spawn(move || {
                let stream = match build_input_stream(
                    gain,
                    block_samples,
                    frame_tx,
                    capture_error,
                    dropped_frames,
                ) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                if let Err(e) = stream.play() {
                    let _ = ready_tx.send(Err(PipelineError::Device(e.to_string())));
                    return;
                }
                let _ = ready_tx.send(Ok(()));

                // Parked until the controller signals stop (or drops us); the
                // stream keeps capturing for exactly as long as it lives here.
                let _ = stop_rx.recv();
            })
            .map_err(|e| {
                PipelineError::Device(format!("failed to spawn capture thread: {e}"))
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread.join();
                return Err(PipelineError::Device(
                    "capture thread died during startup".into(),
                ));
            }
        }

        self.capture_thread = Some(thread);
        self.stop_tx = Some(stop_tx);
        info!("Microphone capture started");
        Ok(frame_rx)
    }

    async fn stop(&mut self) -> Result<()> {
        // Dropping the sender wakes the capture thread, which drops the
        // stream and with it the last frame sender.
        drop(self.stop_tx.take());
        if let Some(thread) = self.capture_thread.take() {
            if thread.join().is_err() {
                error!("Capture thread panicked");
            }
        }

        let dropped = self.dropped_frames.swap(0, Ordering::Relaxed);
        if dropped > 0 {
            warn!("Capture dropped {} frames on a full channel", dropped);
        }

        if let Some(message) = self.capture_error.lock().unwrap().take() {
            return Err(PipelineError::Device(message));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "microphone"
    }
}

fn build_input_stream(
    gain: Arc<GainControl>,
    block_samples: usize,
    frame_tx: mpsc::Sender<Frame>,
    capture_error: Arc<Mutex<Option<String>>>,
    dropped_frames: Arc<AtomicUsize>,
) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| PipelineError::Device("no default input device".into()))?;
    let device_name = device.name().unwrap_or_else(|_| "<unknown>".into());

    let sample_format = device
        .default_input_config()
        .map_err(|e| PipelineError::Device(e.to_string()))?
        .sample_format();

    // The device is opened directly in canonical rate/layout; only the sample
    // format follows the hardware and is converted in the callback.
    let stream_config = StreamConfig {
        channels: CHANNELS,
        sample_rate: SampleRate(SAMPLE_RATE),
        buffer_size: BufferSize::Default,
    };

    info!(
        "Opening capture device '{}' at {}Hz mono ({:?} samples)",
        device_name, SAMPLE_RATE, sample_format
    );

    let err_fn = {
        let capture_error = Arc::clone(&capture_error);
        move |err: cpal::StreamError| {
            error!("Capture stream error: {}", err);
            let mut slot = capture_error.lock().unwrap();
            if slot.is_none() {
                *slot = Some(err.to_string());
            }
        }
    };

    let mut assembler = FrameAssembler::new(block_samples);
    let stream = match sample_format {
        SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _| {
                let mut samples = data.to_vec();
                forward_block(&mut samples, &gain, &mut assembler, &frame_tx, &dropped_frames);
            },
            err_fn,
            None,
        ),
        SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _| {
                let mut samples: Vec<i16> = data
                    .iter()
                    .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                    .collect();
                forward_block(&mut samples, &gain, &mut assembler, &frame_tx, &dropped_frames);
            },
            err_fn,
            None,
        ),
        SampleFormat::U16 => device.build_input_stream(
            &stream_config,
            move |data: &[u16], _| {
                let mut samples: Vec<i16> = data
                    .iter()
                    .map(|&s| (s as i32 - 32_768) as i16)
                    .collect();
                forward_block(&mut samples, &gain, &mut assembler, &frame_tx, &dropped_frames);
            },
            err_fn,
            None,
        ),
        other => {
            return Err(PipelineError::Device(format!(
                "unsupported input sample format {other:?}"
            )))
        }
    };

    stream.map_err(|e| PipelineError::Device(e.to_string()))
}

/// Runs on the device callback thread: gain, re-chunk, non-blocking enqueue.
fn forward_block(
    samples: &mut [i16],
    gain: &GainControl,
    assembler: &mut FrameAssembler,
    frame_tx: &mpsc::Sender<Frame>,
    dropped_frames: &AtomicUsize,
) {
    gain.apply(samples);
    assembler.push(samples, |frame| {
        match frame_tx.try_send(frame) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                let dropped = dropped_frames.fetch_add(1, Ordering::Relaxed) + 1;
                if dropped == 1 || dropped % 100 == 0 {
                    warn!("Frame channel full, {} frames dropped so far", dropped);
                }
            }
            // Consumer is gone; the session is shutting down.
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    });
}
