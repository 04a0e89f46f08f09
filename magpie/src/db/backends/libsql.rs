use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::connection::Database;
use crate::db::repository::{
    DocumentRepository, SectionRepository, SessionRepository, TokenRepository,
};
use crate::db::traits::{
    DatabaseBackend, DocumentStore, SectionStore, SessionStore, TokenStore,
};
use crate::error::Result;
use crate::models::{
    Document, DocumentSummary, PendingDocument, Section, SectionMatch, Session, TokenBundle,
};

/// libSQL-backed storage. Each call opens a fresh connection from the
/// shared handle; libSQL connections are cheap views over one database.
#[derive(Clone)]
pub struct LibSqlBackend {
    database: Database,
}

impl LibSqlBackend {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    fn conn(&self) -> Result<libsql::Connection> {
        self.database.connect()
    }
}

#[async_trait]
impl DocumentStore for LibSqlBackend {
    async fn create_document(&self, doc: &Document) -> Result<()> {
        DocumentRepository::create(&self.conn()?, doc).await
    }

    async fn get_document_by_id(&self, user_id: &str, id: &str) -> Result<Option<Document>> {
        DocumentRepository::get_by_id(&self.conn()?, user_id, id).await
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        DocumentRepository::get(&self.conn()?, id).await
    }

    async fn get_documents_by_ids(&self, user_id: &str, ids: &[String]) -> Result<Vec<Document>> {
        DocumentRepository::get_by_ids(&self.conn()?, user_id, ids).await
    }

    async fn find_document_by_checksum(
        &self,
        user_id: &str,
        checksum: &str,
    ) -> Result<Option<Document>> {
        DocumentRepository::find_by_checksum(&self.conn()?, user_id, checksum).await
    }

    async fn find_document_by_url(&self, user_id: &str, url: &str) -> Result<Option<Document>> {
        DocumentRepository::find_by_url(&self.conn()?, user_id, url).await
    }

    async fn list_documents(&self, user_id: &str, limit: u32) -> Result<Vec<DocumentSummary>> {
        DocumentRepository::list(&self.conn()?, user_id, limit).await
    }

    async fn update_document_tags(&self, id: &str, tags: &[String]) -> Result<()> {
        DocumentRepository::update_tags(&self.conn()?, id, tags).await
    }

    async fn update_document_embedding(
        &self,
        id: &str,
        chunks: &[String],
        centroid: &[f32],
    ) -> Result<()> {
        DocumentRepository::update_embedding(&self.conn()?, id, chunks, centroid).await
    }

    async fn get_pending_documents(&self, limit: u32) -> Result<Vec<PendingDocument>> {
        DocumentRepository::get_pending(&self.conn()?, limit).await
    }

    async fn pattern_search_documents(
        &self,
        user_id: &str,
        pattern: &str,
        limit: u32,
    ) -> Result<Vec<Document>> {
        DocumentRepository::pattern_search(&self.conn()?, user_id, pattern, limit).await
    }
}

#[async_trait]
impl SectionStore for LibSqlBackend {
    async fn create_sections_batch(&self, sections: &[Section]) -> Result<()> {
        SectionRepository::create_batch(&self.conn()?, sections).await
    }

    async fn delete_sections_by_document_id(&self, document_id: &str) -> Result<()> {
        SectionRepository::delete_by_document_id(&self.conn()?, document_id).await?;
        Ok(())
    }

    async fn match_sections(
        &self,
        user_id: &str,
        embedding: &[f32],
        threshold: f32,
        limit: u32,
    ) -> Result<Vec<SectionMatch>> {
        SectionRepository::match_sections(&self.conn()?, user_id, embedding, threshold, limit).await
    }

    async fn pattern_search_sections(
        &self,
        user_id: &str,
        pattern: &str,
        limit: u32,
    ) -> Result<Vec<SectionMatch>> {
        SectionRepository::pattern_search(&self.conn()?, user_id, pattern, limit).await
    }
}

#[async_trait]
impl SessionStore for LibSqlBackend {
    async fn create_session(&self, session: &Session) -> Result<()> {
        SessionRepository::create(&self.conn()?, session).await
    }

    async fn list_sessions(&self, user_id: &str, limit: u32) -> Result<Vec<Session>> {
        SessionRepository::list(&self.conn()?, user_id, limit).await
    }
}

#[async_trait]
impl TokenStore for LibSqlBackend {
    async fn get_token_bundle(
        &self,
        user_id: &str,
        provider: &str,
    ) -> Result<Option<TokenBundle>> {
        TokenRepository::get(&self.conn()?, user_id, provider).await
    }

    async fn update_access_token(
        &self,
        user_id: &str,
        provider: &str,
        access_token: &str,
        expiry: DateTime<Utc>,
    ) -> Result<()> {
        TokenRepository::update_access_token(&self.conn()?, user_id, provider, access_token, expiry)
            .await
    }

    async fn upsert_token_bundle(&self, bundle: &TokenBundle) -> Result<()> {
        TokenRepository::upsert(&self.conn()?, bundle).await
    }
}

#[async_trait]
impl DatabaseBackend for LibSqlBackend {
    async fn sync(&self) -> Result<()> {
        self.database.sync().await
    }
}
