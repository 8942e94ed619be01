//! HTTP mapping of `CrossgateError`.
//!
//! Lookup misses are 404 and policy denials 401; the two are kept apart so
//! callers can tell a missing service from a refused one.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crossgate_core::error::CrossgateError;

#[derive(Debug)]
pub struct ApiError(pub CrossgateError);

impl From<CrossgateError> for ApiError {
    fn from(e: CrossgateError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            CrossgateError::BadRequest(_) | CrossgateError::InvalidPolicy(_) => StatusCode::BAD_REQUEST,
            CrossgateError::NotFound(_) => StatusCode::NOT_FOUND,
            CrossgateError::AuthFailed
            | CrossgateError::NotAllowed(_)
            | CrossgateError::NoTargetPeers(_) => StatusCode::UNAUTHORIZED,
            CrossgateError::UpstreamFailed(_) => StatusCode::BAD_GATEWAY,
            CrossgateError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            CrossgateError::UnsupportedVersion | CrossgateError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, %status, "request rejected");
        }
        let body = Json(json!({
            "error": self.0.client_code().as_str(),
            "message": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}
