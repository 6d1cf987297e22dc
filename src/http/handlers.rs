use std::path::PathBuf;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::state::AppState;
use crate::error::PipelineError;
use crate::session::SessionStats;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct TranscribeFileRequest {
    /// Path of the audio file to transcribe
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct SetGainRequest {
    /// Linear gain, clamped to [0.0, 2.0]
    pub gain: f32,
}

#[derive(Debug, Serialize)]
pub struct StartRecordingResponse {
    pub status: String,
    pub transcript_path: String,
}

#[derive(Debug, Serialize)]
pub struct StopRecordingResponse {
    pub status: String,
    pub stats: SessionStats,
}

#[derive(Debug, Serialize)]
pub struct SetGainResponse {
    pub gain: f32,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Session errors never escape to crash the shell; they become status codes.
fn error_response(e: PipelineError) -> Response {
    let status = match &e {
        PipelineError::InvalidState(_) => StatusCode::CONFLICT,
        PipelineError::Decode { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorResponse { error: e.to_string() })).into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /session/start
/// Start a live recording session
pub async fn start_recording(State(state): State<AppState>) -> impl IntoResponse {
    info!("Start recording requested");

    match state.controller.start().await {
        Ok(artifact) => (
            StatusCode::OK,
            Json(StartRecordingResponse {
                status: "recording".to_string(),
                transcript_path: artifact.display().to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to start recording: {}", e);
            error_response(e)
        }
    }
}

/// POST /session/stop
/// Stop the live recording session
pub async fn stop_recording(State(state): State<AppState>) -> impl IntoResponse {
    info!("Stop recording requested");

    match state.controller.stop().await {
        Ok(stats) => (
            StatusCode::OK,
            Json(StopRecordingResponse {
                status: "stopped".to_string(),
                stats,
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to stop recording: {}", e);
            error_response(e)
        }
    }
}

/// POST /session/file
/// Transcribe an audio file to completion
pub async fn transcribe_file(
    State(state): State<AppState>,
    Json(req): Json<TranscribeFileRequest>,
) -> impl IntoResponse {
    info!("File transcription requested: {}", req.path);

    match state.controller.run_file(PathBuf::from(req.path)).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => {
            error!("File transcription failed: {}", e);
            error_response(e)
        }
    }
}

/// PUT /session/gain
/// Adjust the input gain (takes effect immediately on the active source)
pub async fn set_gain(
    State(state): State<AppState>,
    Json(req): Json<SetGainRequest>,
) -> impl IntoResponse {
    state.controller.set_gain(req.gain);
    (
        StatusCode::OK,
        Json(SetGainResponse {
            gain: state.controller.gain(),
        }),
    )
        .into_response()
}

/// GET /session/status
/// Get controller state and session statistics
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.controller.status())).into_response()
}

/// GET /session/transcript
/// Get the finalized segments of the active (or most recent) session
pub async fn get_transcript(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.controller.transcript())).into_response()
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
