use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Metadata, SourceKind};

/// A normalized document owned by one user. Created exactly once per
/// distinct `(user_id, checksum)`; `chunks`, `tags`, and `centroid` are
/// backfilled by the embedding pipeline after creation and are the only
/// fields ever mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub url: Option<String>,
    pub content: String,
    pub source: SourceKind,
    /// SHA-256 hex digest of `content`, the dedup key.
    pub checksum: String,
    pub tags: Vec<String>,
    /// Ordered text windows produced by the chunker. Parallel to the
    /// stored sections once the embed pass completes.
    pub chunks: Vec<String>,
    /// Arithmetic mean over section embeddings. `None` until the embed
    /// pass completes (and indefinitely if it keeps failing).
    pub centroid: Option<Vec<f32>>,
    /// True once sections + centroid have been written.
    pub embedded: bool,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
}

impl Document {
    pub fn new(
        id: String,
        user_id: String,
        title: String,
        url: Option<String>,
        content: String,
        source: SourceKind,
        checksum: String,
        metadata: Metadata,
    ) -> Self {
        Self {
            id,
            user_id,
            title,
            url,
            content,
            source,
            checksum,
            tags: Vec::new(),
            chunks: Vec::new(),
            centroid: None,
            embedded: false,
            metadata,
            created_at: Utc::now(),
        }
    }
}

/// Lightweight listing row; omits full content and vectors.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub id: String,
    pub title: String,
    pub url: Option<String>,
    pub source: SourceKind,
    pub tags: Vec<String>,
    pub embedded: bool,
    #[schema(value_type = String)]
    pub created_at: DateTime<Utc>,
}

impl From<Document> for DocumentSummary {
    fn from(doc: Document) -> Self {
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

/// A document whose embed pass has not completed, picked up by the
/// background sweeper.
#[derive(Debug, Clone)]
pub struct PendingDocument {
    pub id: String,
    pub created_at: DateTime<Utc>,
}
