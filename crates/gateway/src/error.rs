//! HTTP mapping of pipeline errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use ripple_core::Error;

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
    /// Trace ID.
    pub trace_id: Option<String>,
}

/// A failed request, tagged with its trace ID.
#[derive(Debug)]
pub struct ApiError {
    pub error: Error,
    pub trace_id: Option<String>,
}

impl ApiError {
    pub fn new(error: Error, trace_id: impl Into<String>) -> Self {
        Self {
            error,
            trace_id: Some(trace_id.into()),
        }
    }

    pub fn status(&self) -> StatusCode {
        if self.error.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self {
            error,
            trace_id: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(trace_id = ?self.trace_id, error = %self.error, "Request failed");
        } else {
            tracing::info!(trace_id = ?self.trace_id, error = %self.error, "Request rejected");
        }
        let body = ErrorResponse {
            code: self.error.code().to_string(),
            message: self.error.to_string(),
            trace_id: self.trace_id,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(Error::missing_precondition("no image")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(Error::unknown_action("teleport")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(Error::internal("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
