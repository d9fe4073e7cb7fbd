// src/error.rs
//! Pipeline-level errors and their HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::request::FetchFailure;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("no content available from any source ({} fetch failures)", failures.len())]
    NoContentAvailable { failures: Vec<FetchFailure> },

    #[error("summarization failed: {detail}")]
    SummarizationFailed { detail: String, timed_out: bool },

    #[error("audio generation failed: {detail}")]
    AudioGenerationFailed { detail: String, timed_out: bool },
}

impl PipelineError {
    /// Pipeline stage name used in error bodies and metric labels.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::InvalidRequest(_) => "validation",
            PipelineError::NoContentAvailable { .. } => "fetch",
            PipelineError::SummarizationFailed { .. } => "summarize",
            PipelineError::AudioGenerationFailed { .. } => "synthesize",
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::InvalidRequest(_) => "InvalidRequest",
            PipelineError::NoContentAvailable { .. } => "NoContentAvailable",
            PipelineError::SummarizationFailed { .. } => "SummarizationFailed",
            PipelineError::AudioGenerationFailed { .. } => "AudioGenerationFailed",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            PipelineError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            PipelineError::NoContentAvailable { failures } => {
                if !failures.is_empty() && failures.iter().all(|f| f.timed_out) {
                    StatusCode::GATEWAY_TIMEOUT
                } else {
                    StatusCode::BAD_GATEWAY
                }
            }
            PipelineError::SummarizationFailed { timed_out, .. }
            | PipelineError::AudioGenerationFailed { timed_out, .. } => {
                if *timed_out {
                    StatusCode::GATEWAY_TIMEOUT
                } else {
                    StatusCode::BAD_GATEWAY
                }
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub stage: &'static str,
    pub detail: String,
    /// Per-fetch reasons behind `NoContentAvailable`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FetchFailure>,
}

impl From<PipelineError> for ErrorBody {
    fn from(err: PipelineError) -> Self {
        let error = err.kind();
        let stage = err.stage();
        let detail = err.to_string();
        let failures = match err {
            PipelineError::NoContentAvailable { failures } => failures,
            _ => Vec::new(),
        };
        Self {
            error,
            stage,
            detail,
            failures,
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(ErrorBody::from(self))).into_response()
    }
}
