//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use labsim_domain::error::LabSimError;

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps [`LabSimError`] to an HTTP response with appropriate status code.
pub struct ApiError(LabSimError);

impl From<LabSimError> for ApiError {
    fn from(err: LabSimError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            LabSimError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            LabSimError::DeviceBusy(err) => (StatusCode::CONFLICT, err.to_string()),
            LabSimError::NotFound(err) => (StatusCode::NOT_FOUND, err.to_string()),
            LabSimError::Hardware(err) => {
                tracing::error!(error = %err, "hardware error");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
