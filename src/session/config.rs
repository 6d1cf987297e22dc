use std::path::PathBuf;

use crate::audio::SourceConfig;

/// Configuration for the sessions a controller spawns.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Frame block size and channel capacity
    pub source: SourceConfig,

    /// Directory receiving the timestamp-named transcript artifacts
    pub output_dir: PathBuf,

    /// Gain applied until the shell adjusts it (1.0 = unity)
    pub initial_gain: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            output_dir: PathBuf::from("transcripts"),
            initial_gain: 1.0,
        }
    }
}
