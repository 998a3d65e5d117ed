//! HTTP error mapping.

use crate::llm::LlmError;
use crate::pipeline::{PipelineError, UnknownPromptType};
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sb_core::error::ParseError;
use sb_plugin::save::SaveError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("`prompt` is required")]
    EmptyPrompt,

    #[error("invalid scene: {0}")]
    InvalidScene(#[from] ParseError),

    #[error(transparent)]
    UnknownPromptType(#[from] UnknownPromptType),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("forwarding the scene failed: {0}")]
    Forward(#[from] SaveError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidBody(_) | ApiError::EmptyPrompt | ApiError::InvalidScene(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::UnknownPromptType(_) => StatusCode::NOT_FOUND,
            ApiError::Pipeline(PipelineError::EmptyPrompt | PipelineError::MissingScene) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Pipeline(PipelineError::Llm(err)) | ApiError::Llm(err) => llm_status(err),
            ApiError::Pipeline(PipelineError::Encode(_)) | ApiError::Forward(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

fn llm_status(err: &LlmError) -> StatusCode {
    match err {
        LlmError::MissingApiKey | LlmError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        LlmError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        LlmError::Upstream { .. } | LlmError::EmptyCompletion | LlmError::Http(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("request failed: {self}");
        } else {
            log::debug!("request rejected ({status}): {self}");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_failures_map_to_status_codes() {
        assert_eq!(
            ApiError::Llm(LlmError::MissingApiKey).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Pipeline(PipelineError::Llm(LlmError::RateLimited { retry_after: None }))
                .status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError::Llm(LlmError::Upstream {
                status: 503,
                message: "down".into()
            })
            .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(UnknownPromptType("remix".into())).status(),
            StatusCode::NOT_FOUND
        );
    }
}
