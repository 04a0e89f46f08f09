use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    Document, DocumentSummary, PendingDocument, Section, SectionMatch, Session, TokenBundle,
};

/// CRUD and query operations for documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document row. Fails with a constraint violation if
    /// another document with the same `(user_id, checksum)` exists.
    async fn create_document(&self, doc: &Document) -> Result<()>;
    async fn get_document_by_id(&self, user_id: &str, id: &str) -> Result<Option<Document>>;
    /// Unscoped lookup for internal pipelines; handlers use the
    /// user-scoped variant.
    async fn get_document(&self, id: &str) -> Result<Option<Document>>;
    async fn get_documents_by_ids(&self, user_id: &str, ids: &[String]) -> Result<Vec<Document>>;
    async fn find_document_by_checksum(
        &self,
        user_id: &str,
        checksum: &str,
    ) -> Result<Option<Document>>;
    async fn find_document_by_url(&self, user_id: &str, url: &str) -> Result<Option<Document>>;
    async fn list_documents(&self, user_id: &str, limit: u32) -> Result<Vec<DocumentSummary>>;
    async fn update_document_tags(&self, id: &str, tags: &[String]) -> Result<()>;
    /// Backfill chunks + centroid and mark the embed pass complete.
    async fn update_document_embedding(
        &self,
        id: &str,
        chunks: &[String],
        centroid: &[f32],
    ) -> Result<()>;
    /// Documents whose embed pass has not completed, oldest first.
    async fn get_pending_documents(&self, limit: u32) -> Result<Vec<PendingDocument>>;
    /// Case-insensitive substring match over document content, user scoped.
    async fn pattern_search_documents(
        &self,
        user_id: &str,
        pattern: &str,
        limit: u32,
    ) -> Result<Vec<Document>>;
}

/// CRUD and vector-search operations for sections.
#[async_trait]
pub trait SectionStore: Send + Sync {
    async fn create_sections_batch(&self, sections: &[Section]) -> Result<()>;
    async fn delete_sections_by_document_id(&self, document_id: &str) -> Result<()>;
    /// Nearest-neighbor match, user scoped, filtered by similarity
    /// threshold and capped.
    async fn match_sections(
        &self,
        user_id: &str,
        embedding: &[f32],
        threshold: f32,
        limit: u32,
    ) -> Result<Vec<SectionMatch>>;
    /// Case-insensitive substring match over section content, user scoped.
    async fn pattern_search_sections(
        &self,
        user_id: &str,
        pattern: &str,
        limit: u32,
    ) -> Result<Vec<SectionMatch>>;
}

/// Append-only conversation history.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, session: &Session) -> Result<()>;
    async fn list_sessions(&self, user_id: &str, limit: u32) -> Result<Vec<Session>>;
}

/// OAuth token bundle persistence.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get_token_bundle(&self, user_id: &str, provider: &str)
        -> Result<Option<TokenBundle>>;
    /// Persist a refreshed access token + expiry in a single statement.
    async fn update_access_token(
        &self,
        user_id: &str,
        provider: &str,
        access_token: &str,
        expiry: chrono::DateTime<chrono::Utc>,
    ) -> Result<()>;
    async fn upsert_token_bundle(&self, bundle: &TokenBundle) -> Result<()>;
}

/// A full storage backend. `Arc<dyn DatabaseBackend>` is the handle shared
/// across services so each component can be tested with fakes.
#[async_trait]
pub trait DatabaseBackend:
    DocumentStore + SectionStore + SessionStore + TokenStore
{
    /// Sync with remote (e.g. Turso replication). No-op for local-only backends.
    async fn sync(&self) -> Result<()>;
}
