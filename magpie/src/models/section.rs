use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One embeddable chunk of a document, indexed for nearest-neighbor
/// search. Every section belongs to an existing document owned by the
/// same user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub document_id: String,
    pub user_id: String,
    pub position: u32,
    pub content: String,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

/// A section returned by similarity or pattern search. `similarity` is
/// computed at query time and is absent for pattern matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionMatch {
    pub section_id: String,
    pub document_id: String,
    pub content: String,
    pub similarity: Option<f32>,
}
