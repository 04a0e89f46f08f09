//! v1 import handlers.
//!
//! Each import endpoint fetches a batch from its source adapter and pushes
//! it through the ingest gate one item at a time. The batch itself always
//! answers 200 with per-item statuses; only request-level failures (bad
//! credentials, an upstream listing error) surface as error envelopes.

use axum::extract::State;

use crate::api::v1::dto::{
    GmailValidateRequest, GmailValidateResponse, GoogleImportRequest, ImportItemResponse,
    ImportResponse, NotionImportRequest, ObsidianImportRequest,
};
use crate::api::v1::response::ApiResponse;
use crate::api::AppState;
use crate::error::{MagpieError, Result};
use crate::models::SourceKind;
use crate::services::ImportReportItem;
use crate::sources::gmail::GmailSource;
use crate::sources::google::GoogleDocsSource;
use crate::sources::notion::NotionSource;
use crate::sources::obsidian::{ObsidianFile, ObsidianSource};
use crate::sources::SourceAdapter;

/// `POST /api/v1/imports/google-docs`
#[utoipa::path(
    post,
    path = "/api/v1/imports/google-docs",
    tag = "imports",
    operation_id = "imports.googleDocs",
    request_body = GoogleImportRequest,
    responses(
        (status = 200, description = "Per-item import outcomes", body = ImportResponse),
        (status = 401, description = "No valid Google connection"),
    )
)]
pub async fn import_google_docs(
    State(state): State<AppState>,
    axum::Json(req): axum::Json<GoogleImportRequest>,
) -> ApiResponse<ImportResponse> {
    let batch = async {
        let access_token = state
            .tokens
            .get_valid_access_token(&req.user_id, "google")
            .await?;
        let source = GoogleDocsSource::new(&state.config.sources, access_token, req.document_ids)?;
        run_import(&state, &req.user_id, &source).await
    }
    .await;

    match batch {
        Ok(report) => respond_with_report(&state, &req.user_id, SourceKind::GoogleDocs, report),
        Err(error) => ApiResponse::from_error(&error),
    }
}

/// `POST /api/v1/imports/notion`
#[utoipa::path(
    post,
    path = "/api/v1/imports/notion",
    tag = "imports",
    operation_id = "imports.notion",
    request_body = NotionImportRequest,
    responses(
        (status = 200, description = "Per-item import outcomes", body = ImportResponse),
        (status = 401, description = "No valid Notion connection"),
    )
)]
pub async fn import_notion(
    State(state): State<AppState>,
    axum::Json(req): axum::Json<NotionImportRequest>,
) -> ApiResponse<ImportResponse> {
    let batch = async {
        let access_token = notion_access_token(&state, &req.user_id).await?;
        let source = NotionSource::new(&state.config.sources, access_token)?;
        run_import(&state, &req.user_id, &source).await
    }
    .await;

    match batch {
        Ok(report) => respond_with_report(&state, &req.user_id, SourceKind::Notion, report),
        Err(error) => ApiResponse::from_error(&error),
    }
}

/// `POST /api/v1/imports/obsidian`
#[utoipa::path(
    post,
    path = "/api/v1/imports/obsidian",
    tag = "imports",
    operation_id = "imports.obsidian",
    request_body = ObsidianImportRequest,
    responses(
        (status = 200, description = "Per-item import outcomes", body = ImportResponse),
        (status = 400, description = "Empty file list"),
    )
)]
pub async fn import_obsidian(
    State(state): State<AppState>,
    axum::Json(req): axum::Json<ObsidianImportRequest>,
) -> ApiResponse<ImportResponse> {
    if req.files.is_empty() {
        return ApiResponse::from_error(&MagpieError::Validation(
            "No files provided".to_string(),
        ));
    }

    let files = req
        .files
        .into_iter()
        .map(|f| ObsidianFile {
            name: f.name,
            content: f.content,
        })
        .collect();
    let source = ObsidianSource::new(files);

    match run_import(&state, &req.user_id, &source).await {
        Ok(report) => respond_with_report(&state, &req.user_id, SourceKind::Obsidian, report),
        Err(error) => ApiResponse::from_error(&error),
    }
}

/// `POST /api/v1/imports/gmail/validate`
///
/// Gmail ingestion itself is not wired up yet; this checks that the
/// user's Google token can reach the Gmail profile endpoint.
#[utoipa::path(
    post,
    path = "/api/v1/imports/gmail/validate",
    tag = "imports",
    operation_id = "imports.gmailValidate",
    request_body = GmailValidateRequest,
    responses(
        (status = 200, description = "Connected account email", body = GmailValidateResponse),
        (status = 401, description = "No valid Google connection"),
    )
)]
pub async fn validate_gmail(
    State(state): State<AppState>,
    axum::Json(req): axum::Json<GmailValidateRequest>,
) -> ApiResponse<GmailValidateResponse> {
    let outcome = async {
        let access_token = state
            .tokens
            .get_valid_access_token(&req.user_id, "google")
            .await?;
        let source = GmailSource::new(&state.config.sources)?;
        source.validate(&access_token).await
    }
    .await;

    match outcome {
        Ok(email) => ApiResponse::success(GmailValidateResponse { email }),
        Err(error) => ApiResponse::from_error(&error),
    }
}

async fn run_import(
    state: &AppState,
    user_id: &str,
    source: &dyn SourceAdapter,
) -> Result<Vec<ImportReportItem>> {
    let items = source.fetch().await?;
    Ok(state.ingest.ingest_batch(user_id, source.kind(), items).await)
}

/// Notion tokens have no refresh endpoint, so the stored access token is
/// used as-is rather than going through the refresh path.
async fn notion_access_token(state: &AppState, user_id: &str) -> Result<String> {
    let bundle = state
        .db
        .get_token_bundle(user_id, "notion")
        .await?
        .ok_or_else(|| {
            MagpieError::Config(format!("No notion connection for user {user_id}"))
        })?;
    Ok(bundle.access_token)
}

fn respond_with_report(
    state: &AppState,
    user_id: &str,
    source: SourceKind,
    report: Vec<ImportReportItem>,
) -> ApiResponse<ImportResponse> {
    if let Some(notify) = &state.notify {
        notify.notify_import(user_id.to_string(), source.to_string(), report.clone());
    }

    let items = report.into_iter().map(ImportItemResponse::from).collect();
    ApiResponse::success(ImportResponse { items })
}
