pub mod capture;
pub mod decode;
pub mod file;
pub mod frame;
pub mod gain;
pub mod source;

pub use capture::MicSource;
pub use file::FileSource;
pub use frame::{Frame, FrameAssembler, BLOCK_SAMPLES, CHANNELS, SAMPLE_RATE};
pub use gain::GainControl;
pub use source::{DefaultSourceFactory, FrameSource, SourceConfig, SourceFactory, SourceMode};
