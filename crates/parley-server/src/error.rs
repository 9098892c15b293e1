//! API error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use parley_core::Error;
use serde::Serialize;
use tracing::error;

/// Error returned by any handler.
#[derive(Debug)]
pub struct ApiError(pub Error);

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: String,
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            Error::InvalidSessionId { .. } => (StatusCode::BAD_REQUEST, "INVALID_SESSION_ID"),
            Error::Provider(_) => (StatusCode::BAD_GATEWAY, "MODEL_ERROR"),
            Error::Store { .. } | Error::Backend(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR")
            }
            Error::Decode { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "CORRUPT_CONVERSATION"),
            Error::Serialization(_) | Error::Config(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            error!("{} ({}): {}", code, status.as_u16(), self.0);
        }

        let body = Json(ErrorResponse {
            error: self.0.to_string(),
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::storage::BackendError;

    fn status_of(err: Error) -> StatusCode {
        ApiError(err).into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_of(Error::invalid_session_id("../x", "bad")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(Error::provider("down")), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status_of(Error::store("s1", BackendError::LockPoisoned)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(Error::Config("nope".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
