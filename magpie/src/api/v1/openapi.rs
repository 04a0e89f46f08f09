use axum::Json;
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};

use super::dto;
use super::handlers;
use super::response;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Magpie API",
        version = "1.0.0",
        description = "Personal knowledge copilot. REST API for document ingestion, retrieval, and grounded answering.",
    ),
    paths(
        handlers::health::health_check,
        handlers::imports::import_google_docs,
        handlers::imports::import_notion,
        handlers::imports::import_obsidian,
        handlers::imports::validate_gmail,
        handlers::search::search,
        handlers::ask::ask,
        handlers::documents::list_documents,
        handlers::documents::get_document,
    ),
    components(schemas(
        // Response envelope
        response::ErrorCode,
        response::ApiError,
        crate::error::ErrorKind,
        // Shared models
        models::SourceKind,
        models::ImportStatus,
        models::SearchMode,
        models::DocumentHit,
        models::RelevantSection,
        models::SourceRef,
        // Imports
        dto::imports::GoogleImportRequest,
        dto::imports::NotionImportRequest,
        dto::imports::ObsidianFileUpload,
        dto::imports::ObsidianImportRequest,
        dto::imports::GmailValidateRequest,
        dto::imports::ImportItemResponse,
        dto::imports::ImportResponse,
        dto::imports::GmailValidateResponse,
        // Search
        dto::search::SearchRequest,
        dto::search::SearchResponse,
        // Ask
        dto::ask::AskRequest,
        // Documents
        dto::documents::ListDocumentsQuery,
        dto::documents::GetDocumentQuery,
        dto::documents::DocumentResponse,
        dto::documents::DocumentSummary,
        dto::documents::ListDocumentsResponse,
        // Health (handler-local types)
        handlers::health::HealthData,
        handlers::health::DatabaseStatus,
        handlers::health::EmbeddingsStatus,
        handlers::health::LlmStatus,
    )),
    tags(
        (name = "health", description = "Health check"),
        (name = "imports", description = "Source imports and connection validation"),
        (name = "search", description = "Retrieval over ingested documents"),
        (name = "ask", description = "Streamed, source-grounded answering"),
        (name = "documents", description = "Document listing and retrieval"),
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            utoipa::openapi::security::SecurityScheme::Http(utoipa::openapi::security::Http::new(
                utoipa::openapi::security::HttpAuthScheme::Bearer,
            )),
        );
    }
}

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn redoc_router<S: Clone + Send + Sync + 'static>() -> axum::Router<S> {
    Redoc::with_url("/docs", ApiDoc::openapi()).into()
}
