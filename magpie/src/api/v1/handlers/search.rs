//! v1 search handler.

use axum::extract::State;

use crate::api::v1::dto::{SearchRequest, SearchResponse};
use crate::api::v1::response::{ApiError, ApiResponse};
use crate::api::AppState;

/// `POST /api/v1/search`
///
/// Retrieval over the caller's documents. `mode` picks the strategy:
/// - `similarity` (default) → embedded query against section vectors
/// - `pattern` → literal substring match over titles and section text
#[utoipa::path(
    post,
    path = "/api/v1/search",
    tag = "search",
    operation_id = "search.search",
    request_body = SearchRequest,
    responses(
        (status = 200, description = "Search results", body = SearchResponse),
        (status = 400, description = "Invalid request", body = ApiError),
    )
)]
pub async fn search(
    State(state): State<AppState>,
    axum::Json(req): axum::Json<SearchRequest>,
) -> ApiResponse<SearchResponse> {
    match state.search.search(&req.user_id, &req.q, req.mode).await {
        Ok(hits) => ApiResponse::success(SearchResponse::new(hits)),
        Err(error) => ApiResponse::from_error(&error),
    }
}
