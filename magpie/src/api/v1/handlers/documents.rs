//! v1 document handlers: read-only listing and retrieval. Documents are
//! written only by the import pipeline.

use axum::extract::{Path, Query, State};

use crate::api::v1::dto::{
    DocumentResponse, DocumentSummary, GetDocumentQuery, ListDocumentsQuery, ListDocumentsResponse,
};
use crate::api::v1::response::{ApiError, ApiResponse, ErrorCode};
use crate::api::AppState;

const DEFAULT_LIST_LIMIT: u32 = 20;
const MAX_LIST_LIMIT: u32 = 100;

/// `GET /api/v1/documents`
#[utoipa::path(
    get,
    path = "/api/v1/documents",
    tag = "documents",
    operation_id = "documents.list",
    params(ListDocumentsQuery),
    responses(
        (status = 200, description = "Documents, newest first", body = ListDocumentsResponse),
    )
)]
pub async fn list_documents(
    State(state): State<AppState>,
    Query(query): Query<ListDocumentsQuery>,
) -> ApiResponse<ListDocumentsResponse> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .min(MAX_LIST_LIMIT);

    match state.db.list_documents(&query.user_id, limit).await {
        Ok(docs) => ApiResponse::success(ListDocumentsResponse {
            documents: docs.into_iter().map(DocumentSummary::from).collect(),
        }),
        Err(error) => ApiResponse::from_error(&error),
    }
}

/// `GET /api/v1/documents/{documentId}`
#[utoipa::path(
    get,
    path = "/api/v1/documents/{documentId}",
    tag = "documents",
    operation_id = "documents.get",
    params(
        ("documentId" = String, Path, description = "Document ID"),
        GetDocumentQuery,
    ),
    responses(
        (status = 200, description = "The document", body = DocumentResponse),
        (status = 404, description = "Not found", body = ApiError),
    )
)]
pub async fn get_document(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
    Query(query): Query<GetDocumentQuery>,
) -> ApiResponse<DocumentResponse> {
    match state
        .db
        .get_document_by_id(&query.user_id, &document_id)
        .await
    {
        Ok(Some(doc)) => ApiResponse::success(DocumentResponse::from(doc)),
        Ok(None) => ApiResponse::error(
            ErrorCode::NotFound,
            format!("Document {document_id} not found"),
        ),
        Err(error) => ApiResponse::from_error(&error),
    }
}
