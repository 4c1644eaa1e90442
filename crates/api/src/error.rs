//! HTTP mapping for assistant errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use mausam_core::{AssistantError, ErrorKind};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Assistant(#[from] AssistantError),

    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Assistant(AssistantError::RegionNotFound(_)) => StatusCode::NOT_FOUND,
            Self::Assistant(err) => match err.kind() {
                ErrorKind::User => StatusCode::BAD_REQUEST,
                ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Assistant(err) => err.code(),
            Self::BadRequest(_) => "invalid_input",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Upstream variants display a generic message; the cause stays in logs.
        let body = json!({
            "error": self.code(),
            "message": self.to_string(),
        });
        (self.status(), Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
