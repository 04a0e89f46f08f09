//! Import request/response DTOs for the v1 API.

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;
use crate::models::ImportStatus;
use crate::services::ImportReportItem;

// ---------------------------------------------------------------------------
// Request DTOs
// ---------------------------------------------------------------------------

/// Request body for `POST /v1/imports/google-docs`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GoogleImportRequest {
    /// Owner of the imported documents.
    pub user_id: String,
    /// Explicit document IDs to import. When absent, the most recently
    /// modified documents are listed from Drive instead.
    pub document_ids: Option<Vec<String>>,
}

/// Request body for `POST /v1/imports/notion`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotionImportRequest {
    /// Owner of the imported pages.
    pub user_id: String,
}

/// One uploaded vault file in an Obsidian import.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObsidianFileUpload {
    /// File name, typically ending in `.md`.
    pub name: String,
    /// Raw markdown content.
    pub content: String,
}

/// Request body for `POST /v1/imports/obsidian`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObsidianImportRequest {
    /// Owner of the imported notes.
    pub user_id: String,
    /// Vault files uploaded by the client.
    pub files: Vec<ObsidianFileUpload>,
}

/// Request body for `POST /v1/imports/gmail/validate`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GmailValidateRequest {
    /// User whose Google connection should be checked.
    pub user_id: String,
}

// ---------------------------------------------------------------------------
// Response DTOs
// ---------------------------------------------------------------------------

/// Per-item outcome in an import response.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportItemResponse {
    /// Document ID, present for `created` and `existing` items.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub status: ImportStatus,
    /// Failure classification, present only for `error` items.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<ImportReportItem> for ImportItemResponse {
    fn from(item: ImportReportItem) -> Self {
        Self {
            id: item.id,
            title: item.title,
            status: item.status,
            error_type: item.error_type,
            reason: item.reason,
        }
    }
}

/// Response for the three import endpoints. The batch always returns 200;
/// failures surface as per-item `error` statuses.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    pub items: Vec<ImportItemResponse>,
}

/// Response for `POST /v1/imports/gmail/validate`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GmailValidateResponse {
    /// Email address of the connected account.
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn google_request_deserializes_without_ids() {
        let json = r#"{"userId": "u1"}"#;
        let req: GoogleImportRequest = serde_json::from_str(json).expect("deserialize");
        assert_eq!(req.user_id, "u1");
        assert!(req.document_ids.is_none());
    }

    #[test]
    fn import_item_omits_missing_id() {
        let item = ImportItemResponse {
            id: None,
            title: "Broken doc".to_string(),
            status: ImportStatus::Error,
            error_type: Some(ErrorKind::Auth),
            reason: Some("token revoked".to_string()),
        };
        let json = serde_json::to_value(&item).expect("serialize");
        assert!(json.get("id").is_none());
        assert_eq!(json.get("status").expect("status"), "error");
        assert_eq!(json.get("errorType").expect("errorType"), "auth");
    }

    #[test]
    fn successful_item_omits_error_fields() {
        let item = ImportItemResponse {
            id: Some("d1".to_string()),
            title: "Doc".to_string(),
            status: ImportStatus::Created,
            error_type: None,
            reason: None,
        };
        let json = serde_json::to_value(&item).expect("serialize");
        assert!(json.get("errorType").is_none());
        assert!(json.get("reason").is_none());
    }

    #[test]
    fn obsidian_request_deserializes_files() {
        let json = r##"{"userId": "u1", "files": [{"name": "note.md", "content": "# Hi"}]}"##;
        let req: ObsidianImportRequest = serde_json::from_str(json).expect("deserialize");
        assert_eq!(req.files.len(), 1);
        assert_eq!(req.files[0].name, "note.md");
    }
}
