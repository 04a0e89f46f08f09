//! Document request/response DTOs for the v1 API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{self, SourceKind};

/// Query parameters for `GET /v1/documents`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListDocumentsQuery {
    /// Owner whose documents are listed.
    pub user_id: String,
    /// Maximum results (default 20, max 100).
    pub limit: Option<u32>,
}

/// Query parameters for `GET /v1/documents/{documentId}`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct GetDocumentQuery {
    pub user_id: String,
}

/// Full document response. Vector data stays internal; only the chunk
/// count is exposed.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponse {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub content: String,
    pub source: SourceKind,
    pub tags: Vec<String>,
    pub chunk_count: u32,
    /// True once sections and centroid have been written.
    pub embedded: bool,
    #[schema(value_type = Object)]
    pub metadata: models::Metadata,
    #[schema(value_type = String)]
    pub created_at: DateTime<Utc>,
}

impl From<models::Document> for DocumentResponse {
    fn from(doc: models::Document) -> Self {
        Self {
            id: doc.id,
            title: doc.title,
            url: doc.url,
            content: doc.content,
            source: doc.source,
            tags: doc.tags,
            chunk_count: doc.chunks.len() as u32,
            embedded: doc.embedded,
            metadata: doc.metadata,
            created_at: doc.created_at,
        }
    }
}

/// Listing entry for `GET /v1/documents`. Content is omitted to keep
/// list payloads small.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub source: SourceKind,
    pub tags: Vec<String>,
    pub embedded: bool,
    #[schema(value_type = String)]
    pub created_at: DateTime<Utc>,
}

impl From<models::DocumentSummary> for DocumentSummary {
    fn from(doc: models::DocumentSummary) -> Self {
        Self {
            id: doc.id,
            title: doc.title,
            url: doc.url,
            source: doc.source,
            tags: doc.tags,
            embedded: doc.embedded,
            created_at: doc.created_at,
        }
    }
}

/// Response for `GET /v1/documents`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListDocumentsResponse {
    pub documents: Vec<DocumentSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn sample_document() -> models::Document {
        let mut doc = models::Document::new(
            "doc_1".to_string(),
            "u1".to_string(),
            "Notes".to_string(),
            None,
            "body text".to_string(),
            SourceKind::Obsidian,
            "abc".to_string(),
            HashMap::new(),
        );
        doc.chunks = vec!["body text".to_string()];
        doc
    }

    #[test]
    fn document_response_exposes_chunk_count_only() {
        let resp: DocumentResponse = sample_document().into();
        assert_eq!(resp.chunk_count, 1);
        let json = serde_json::to_value(&resp).expect("serialize");
        assert!(json.get("chunks").is_none());
        assert!(json.get("centroid").is_none());
        assert!(json.get("chunkCount").is_some());
    }

    #[test]
    fn summary_omits_content() {
        let summary: DocumentSummary = models::DocumentSummary::from(sample_document()).into();
        let json = serde_json::to_value(&summary).expect("serialize");
        assert!(json.get("content").is_none());
        assert_eq!(json.get("source").expect("source"), "obsidian");
    }
}
