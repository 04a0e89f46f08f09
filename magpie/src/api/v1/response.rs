//! # V1 API Response Envelope & Error Contract
//!
//! Canonical wire format for all v1 endpoints (the NDJSON `/ask` stream
//! excepted). Every response is an [`ApiResponse<T>`] envelope:
//!
//! ```json
//! {
//!   "data": { ... },    // present on success, absent on error
//!   "error": { "code": "not_found", "message": "..." }  // present on error
//! }
//! ```
//!
//! Document and session ids are nanoids (21 characters).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::MagpieError;

/// Machine-readable error code included in every error response.
/// Serialized as snake_case; each variant maps to one HTTP status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Malformed request, invalid parameters, or failed validation. HTTP 400.
    InvalidRequest,
    /// Missing or invalid credentials, ours or an upstream provider's. HTTP 401.
    Unauthorized,
    /// The requested resource does not exist. HTTP 404.
    NotFound,
    /// The content itself cannot be processed. HTTP 422.
    UnprocessableContent,
    /// An upstream API throttled us. HTTP 429.
    RateLimited,
    /// An upstream provider failed. HTTP 502.
    UpstreamError,
    /// A required backend (e.g. the LLM) is not configured or reachable.
    /// HTTP 503.
    ServiceUnavailable,
    /// Unexpected server-side error. Internal details are never leaked.
    /// HTTP 500.
    InternalError,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::UnprocessableContent => StatusCode::UNPROCESSABLE_ENTITY,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::UpstreamError => StatusCode::BAD_GATEWAY,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Structured error payload within the envelope.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ApiError {
    pub code: ErrorCode,
    /// Human-readable description safe to display to end users.
    pub message: String,
}

/// Canonical v1 response envelope: `data` on success, `error` on failure,
/// never both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,

    /// HTTP status to use in the response. Not serialized on the wire.
    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    /// Success response with data (HTTP 200).
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            status: StatusCode::OK,
        }
    }

    /// Error response. HTTP status is derived from the [`ErrorCode`].
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        let status = code.status();
        Self {
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
            status,
        }
    }

    /// Map a service-layer error onto the wire contract.
    pub fn from_error(error: &MagpieError) -> Self {
        let code = match error {
            MagpieError::Validation(_) | MagpieError::Config(_) | MagpieError::UrlParse(_) => {
                ErrorCode::InvalidRequest
            }
            MagpieError::Auth(_) => ErrorCode::Unauthorized,
            MagpieError::NotFound(_) => ErrorCode::NotFound,
            MagpieError::Content(_) => ErrorCode::UnprocessableContent,
            MagpieError::ApiRateLimit { .. } | MagpieError::LlmRateLimit { .. } => {
                ErrorCode::RateLimited
            }
            MagpieError::Source(_) | MagpieError::Http(_) | MagpieError::Llm(_) => {
                ErrorCode::UpstreamError
            }
            MagpieError::LlmUnavailable(_) => ErrorCode::ServiceUnavailable,
            _ => ErrorCode::InternalError,
        };

        let message = if code == ErrorCode::InternalError {
            "An internal error occurred".to_string()
        } else {
            error.to_string()
        };

        Self::error(code, message)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status;
        match serde_json::to_value(&self) {
            Ok(body) => (status, Json(body)).into_response(),
            Err(_) => {
                let body = serde_json::json!({
                    "error": {
                        "code": "internal_error",
                        "message": "An internal error occurred"
                    }
                });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}
