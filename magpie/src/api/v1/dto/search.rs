//! Search request/response DTOs for the v1 API.

use serde::{Deserialize, Serialize};

use crate::models::{DocumentHit, SearchMode};

/// Request body for `POST /v1/search`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    /// User whose documents are searched.
    pub user_id: String,
    /// The search query string. For `pattern` mode this is a literal
    /// substring, not a wildcard expression.
    pub q: String,
    /// Retrieval strategy (default: similarity).
    #[serde(default)]
    pub mode: SearchMode,
}

/// Response for `POST /v1/search`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<DocumentHit>,
    /// Number of matching documents.
    pub total: u32,
}

impl SearchResponse {
    pub fn new(results: Vec<DocumentHit>) -> Self {
        let total = results.len() as u32;
        Self { results, total }
    }
}
