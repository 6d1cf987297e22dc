/// Sample rate the speech engine accepts.
pub const SAMPLE_RATE: u32 = 16_000;
/// The engine consumes mono audio only.
pub const CHANNELS: u16 = 1;
/// Samples per frame (250ms at 16kHz).
pub const BLOCK_SAMPLES: usize = 4_000;

/// One block of canonical-format audio (16kHz, mono, i16 PCM).
///
/// Invariant: every frame on the session channel has this format, regardless
/// of whether it came from the capture device or a decoded file.
#[derive(Debug, Clone)]
pub struct Frame {
    /// PCM samples, already gain-scaled
    pub samples: Vec<i16>,
    /// Milliseconds since the first sample of the stream
    pub timestamp_ms: u64,
}

impl Frame {
    /// Frame duration derived from the sample count.
    pub fn duration_ms(&self) -> u64 {
        self.samples.len() as u64 * 1_000 / SAMPLE_RATE as u64
    }
}

/// Re-chunks arbitrarily sized sample runs into fixed-size frames.
///
/// Capture hardware delivers whatever buffer sizes it likes; the engine wants
/// uniform blocks. Leftover samples stay pending until the next push, or until
/// `finish` drains them as one short trailing frame (file mode only).
pub struct FrameAssembler {
    block_samples: usize,
    pending: Vec<i16>,
    emitted_samples: u64,
}

impl FrameAssembler {
    pub fn new(block_samples: usize) -> Self {
        assert!(block_samples > 0, "block size must be positive");
        Self {
            block_samples,
            pending: Vec::with_capacity(block_samples),
            emitted_samples: 0,
        }
    }

    /// Append samples, invoking `emit` for every completed frame.
    pub fn push(&mut self, mut samples: &[i16], mut emit: impl FnMut(Frame)) {
        while !samples.is_empty() {
            let space = self.block_samples - self.pending.len();
            let take = space.min(samples.len());
            self.pending.extend_from_slice(&samples[..take]);
            samples = &samples[take..];

            if self.pending.len() == self.block_samples {
                emit(self.take_frame());
            }
        }
    }

    /// Drain any pending tail as a short frame.
    pub fn finish(&mut self) -> Option<Frame> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.take_frame())
        }
    }

    fn take_frame(&mut self) -> Frame {
        let timestamp_ms = self.emitted_samples * 1_000 / SAMPLE_RATE as u64;
        self.emitted_samples += self.pending.len() as u64;
        Frame {
            samples: std::mem::take(&mut self.pending),
            timestamp_ms,
        }
    }
}
