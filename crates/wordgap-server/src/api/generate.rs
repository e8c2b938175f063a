//! Generation endpoints
//!
//! Both endpoints take the same JSON body. `/api/generate` answers with the
//! audio file itself, `/api/generate/json` wraps it in base64.

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::info;
use wordgap_core::{AssemblerConfig, BackendKind, ExecutionStrategy, GeneratedAudio};

use crate::error::ApiError;
use crate::state::AppState;

/// Generation request; unset options fall back to the server configuration
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub text: String,
    #[serde(default)]
    pub chunk_size: Option<usize>,
    #[serde(default)]
    pub word_pause_seconds: Option<f64>,
    #[serde(default)]
    pub backend: Option<BackendKind>,
    #[serde(default)]
    pub execution_strategy: Option<ExecutionStrategy>,
}

impl GenerateRequest {
    /// Server defaults with this request's overrides applied
    pub fn assembler_config(&self, base: &AssemblerConfig) -> AssemblerConfig {
        let mut config = base.clone();
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        if let Some(pause) = self.word_pause_seconds {
            config.word_pause_seconds = pause;
        }
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if let Some(strategy) = self.execution_strategy {
            config.execution_strategy = strategy;
        }
        config
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateQuery {
    /// Serve as an attachment instead of inline
    #[serde(default)]
    pub download: bool,
}

/// JSON form of a generated file
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub audio_base64: String,
    pub format: String,
    pub file_name: String,
    pub sample_rate: u32,
    pub duration_ms: u64,
    pub units: usize,
    pub synthesized: usize,
    pub skipped: Vec<usize>,
}

/// Generate and return the raw audio file
pub async fn audio(
    State(state): State<AppState>,
    Query(query): Query<GenerateQuery>,
    Json(req): Json<GenerateRequest>,
) -> Result<Response, ApiError> {
    let audio = run(&state, &req).await?;

    let disposition = if query.download { "attachment" } else { "inline" };
    let headers = [
        (header::CONTENT_TYPE, audio.content_type().to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("{}; filename=\"{}\"", disposition, audio.file_name()),
        ),
        (
            header::HeaderName::from_static("x-wordgap-units"),
            audio.units.to_string(),
        ),
        (
            header::HeaderName::from_static("x-wordgap-synthesized"),
            audio.synthesized.len().to_string(),
        ),
        (
            header::HeaderName::from_static("x-wordgap-skipped"),
            audio.skipped.len().to_string(),
        ),
        (
            header::HeaderName::from_static("x-wordgap-duration-ms"),
            audio.duration_ms.to_string(),
        ),
    ];

    Ok((headers, audio.bytes).into_response())
}

/// Generate and return the audio as base64 with its metadata
pub async fn json(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let audio = run(&state, &req).await?;

    Ok(Json(GenerateResponse {
        audio_base64: base64::engine::general_purpose::STANDARD.encode(&audio.bytes),
        format: audio.format.extension().to_string(),
        file_name: audio.file_name(),
        sample_rate: audio.sample_rate,
        duration_ms: audio.duration_ms,
        units: audio.units,
        synthesized: audio.synthesized.len(),
        skipped: audio.skipped,
    }))
}

async fn run(state: &AppState, req: &GenerateRequest) -> Result<GeneratedAudio, ApiError> {
    let max_chars = state.config.server.max_text_chars;
    let chars = req.text.chars().count();
    if chars > max_chars {
        return Err(ApiError::bad_request(format!(
            "Text too long ({} characters, max {})",
            chars, max_chars
        )));
    }

    let config = req.assembler_config(&state.config.assembler);
    info!(
        "Generate request: {} chars, chunk_size={}, pause={}s, backend={:?}, strategy={:?}",
        chars,
        config.chunk_size,
        config.word_pause_seconds,
        config.backend,
        config.execution_strategy
    );

    let pipeline = state.pipeline(config)?;
    Ok(pipeline.generate(&req.text).await?)
}
