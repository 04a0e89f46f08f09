use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MagpieError {
    #[error("Database error: {0}")]
    Database(#[from] libsql::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authorization error: {0}")]
    Auth(String),

    #[error("Source API error: {0}")]
    Source(String),

    #[error("Content error: {0}")]
    Content(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("API rate limit exceeded, retry after {retry_after:?} seconds")]
    ApiRateLimit { retry_after: Option<u64> },

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("LLM unavailable: {0}")]
    LlmUnavailable(String),

    #[error("LLM rate limit exceeded, retry after {retry_after:?} seconds")]
    LlmRateLimit { retry_after: Option<u64> },
}

impl MagpieError {
    /// True for unique-constraint violations from the documents dedup
    /// indexes. The ingest gate uses this to resolve insert races by
    /// re-reading the winning row instead of surfacing an error.
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            MagpieError::Database(e) => {
                let msg = e.to_string().to_lowercase();
                msg.contains("unique constraint") || msg.contains("constraint failed")
            }
            _ => false,
        }
    }

    /// Classify this error into the per-item taxonomy reported in batch
    /// import outcomes.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MagpieError::Config(_) => ErrorKind::Config,
            MagpieError::Auth(_) => ErrorKind::Auth,
            MagpieError::Content(_) | MagpieError::Validation(_) => ErrorKind::Content,
            MagpieError::Database(_) => ErrorKind::Storage,
            _ => ErrorKind::Provider,
        }
    }
}

/// Per-item error classification used in batch import results so callers
/// can render a specific remediation action (e.g. "reconnect Google" for
/// `auth`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Config,
    Auth,
    Provider,
    Content,
    Storage,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config => write!(f, "config"),
            Self::Auth => write!(f, "auth"),
            Self::Provider => write!(f, "provider"),
            Self::Content => write!(f, "content"),
            Self::Storage => write!(f, "storage"),
        }
    }
}

impl IntoResponse for MagpieError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            MagpieError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            MagpieError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            MagpieError::Config(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            MagpieError::Auth(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            MagpieError::Database(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            MagpieError::Source(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            MagpieError::Content(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            MagpieError::Embedding(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            MagpieError::Http(e) => (StatusCode::BAD_GATEWAY, e.to_string()),
            MagpieError::Json(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            MagpieError::Io(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            MagpieError::UrlParse(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            MagpieError::ApiRateLimit { .. } => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
            MagpieError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            MagpieError::Llm(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            MagpieError::LlmUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            MagpieError::LlmRateLimit { retry_after } => (
                StatusCode::TOO_MANY_REQUESTS,
                format!("LLM rate limit exceeded, retry after {retry_after:?} seconds"),
            ),
        };

        let body = Json(json!({
            "error": message,
            "code": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, MagpieError>;
