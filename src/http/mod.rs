//! HTTP control surface for the presentation shell
//!
//! This module provides the REST API an external shell drives:
//! - POST /session/start - Start a live recording session
//! - POST /session/stop - Stop the live session
//! - POST /session/file - Transcribe an audio file to completion
//! - PUT /session/gain - Adjust the input gain
//! - GET /session/status - Query controller state
//! - GET /session/transcript - Get the session's finalized segments
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
