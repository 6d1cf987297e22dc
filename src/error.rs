use std::path::PathBuf;

/// Session-scoped error taxonomy.
///
/// Everything here is caught at the `SessionController` boundary and surfaced
/// to the caller; only `Startup` is allowed to terminate the process, and only
/// before the control surface is up.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("speech engine unavailable: {0}")]
    Startup(String),

    #[error("capture device error: {0}")]
    Device(String),

    #[error("failed to decode {}: {reason}", .path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("speech engine error: {0}")]
    Engine(String),

    #[error("transcript I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    InvalidState(String),
}

impl PipelineError {
    pub fn decode(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
