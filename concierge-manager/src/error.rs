//! Translation of gateway errors into HTTP responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use concierge_core::Error;
use serde::Serialize;

/// Error body, `{"detail": "..."}`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// Wrapper that lets handlers return `concierge_core::Error` directly
#[derive(Debug)]
pub struct ApiError(pub Error);

impl ApiError {
    pub fn validation(detail: impl Into<String>) -> Self {
        Self(Error::Validation(detail.into()))
    }

    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = self.0.to_string();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "Request failed: {}", detail);
        } else {
            tracing::warn!(status = status.as_u16(), "Request rejected: {}", detail);
        }

        (status, axum::Json(ErrorBody { detail })).into_response()
    }
}
