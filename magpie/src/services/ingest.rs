use std::sync::Arc;

use nanoid::nanoid;
use sha2::{Digest, Sha256};

use crate::db::DatabaseBackend;
use crate::error::{ErrorKind, MagpieError, Result};
use crate::models::{Document, ImportStatus, Metadata, SourceKind};
use crate::processing::EmbedPipeline;
use crate::sources::ItemResult;

use super::notify::ImportReportItem;
use super::tagging::TaggingService;

/// Hard cap applied on the truncation retry when a full-size insert is
/// rejected by the storage layer.
pub const TRUNCATION_LIMIT: usize = 10_000;
const TRUNCATION_MARKER: &str = "\n\n[Content truncated]";

/// Result of pushing one item through the persistence gate.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    Created { id: String },
    Existing { id: String },
    Failed { kind: ErrorKind, reason: String },
}

impl IngestOutcome {
    pub fn status(&self) -> ImportStatus {
        match self {
            Self::Created { .. } => ImportStatus::Created,
            Self::Existing { .. } => ImportStatus::Existing,
            Self::Failed { .. } => ImportStatus::Error,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Created { id } | Self::Existing { id } => Some(id),
            Self::Failed { .. } => None,
        }
    }
}

/// The only writer of new document rows. Everything imported, whatever
/// the source, funnels through `persist_if_new`.
pub struct IngestService {
    db: Arc<dyn DatabaseBackend>,
    tagging: Arc<TaggingService>,
    pipeline: Arc<EmbedPipeline>,
}

impl IngestService {
    pub fn new(
        db: Arc<dyn DatabaseBackend>,
        tagging: Arc<TaggingService>,
        pipeline: Arc<EmbedPipeline>,
    ) -> Self {
        Self {
            db,
            tagging,
            pipeline,
        }
    }

    /// Dedup gate: persist the item unless an identical one (by content
    /// checksum, or by url for url-keyed sources) already exists.
    pub async fn persist_if_new(
        &self,
        user_id: &str,
        title: &str,
        url: Option<&str>,
        text: &str,
        source: SourceKind,
        metadata: Metadata,
    ) -> Result<IngestOutcome> {
        if source.url_is_identity() {
            if let Some(url) = url {
                if let Some(existing) = self.db.find_document_by_url(user_id, url).await? {
                    tracing::debug!(user_id, url, "Skipping import, url already ingested");
                    return Ok(IngestOutcome::Existing { id: existing.id });
                }
            }
        }

        let checksum = content_checksum(text);
        if let Some(existing) = self.db.find_document_by_checksum(user_id, &checksum).await? {
            tracing::debug!(user_id, checksum, "Skipping import, content already ingested");
            return Ok(IngestOutcome::Existing { id: existing.id });
        }

        let doc = Document::new(
            nanoid!(),
            user_id.to_string(),
            title.to_string(),
            url.map(str::to_string),
            text.to_string(),
            source,
            checksum.clone(),
            metadata.clone(),
        );

        match self.db.create_document(&doc).await {
            Ok(()) => Ok(IngestOutcome::Created { id: doc.id }),
            Err(error) if error.is_constraint_violation() => {
                // Lost an insert race; the winner's row is the document.
                // The race may have been lost on either dedup index, so
                // fall back to the url when the checksum finds nothing.
                if let Some(winner) =
                    self.db.find_document_by_checksum(user_id, &checksum).await?
                {
                    return Ok(IngestOutcome::Existing { id: winner.id });
                }
                if source.url_is_identity() {
                    if let Some(url) = url {
                        if let Some(winner) = self.db.find_document_by_url(user_id, url).await? {
                            return Ok(IngestOutcome::Existing { id: winner.id });
                        }
                    }
                }
                Err(error)
            }
            Err(error) => {
                tracing::warn!(error = %error, len = text.len(), "Insert failed, retrying truncated");
                self.persist_truncated(user_id, title, url, text, source, metadata)
                    .await
            }
        }
    }

    /// Single truncation retry after a non-constraint insert failure.
    async fn persist_truncated(
        &self,
        user_id: &str,
        title: &str,
        url: Option<&str>,
        text: &str,
        source: SourceKind,
        mut metadata: Metadata,
    ) -> Result<IngestOutcome> {
        let truncated = truncate_content(text);
        metadata.insert("truncated".to_string(), serde_json::json!(true));
        metadata.insert(
            "original_length".to_string(),
            serde_json::json!(text.chars().count()),
        );

        let checksum = content_checksum(&truncated);
        if let Some(existing) = self.db.find_document_by_checksum(user_id, &checksum).await? {
            return Ok(IngestOutcome::Existing { id: existing.id });
        }

        let doc = Document::new(
            nanoid!(),
            user_id.to_string(),
            title.to_string(),
            url.map(str::to_string),
            truncated,
            source,
            checksum.clone(),
            metadata,
        );

        match self.db.create_document(&doc).await {
            Ok(()) => Ok(IngestOutcome::Created { id: doc.id }),
            Err(error) if error.is_constraint_violation() => {
                let winner = self
                    .db
                    .find_document_by_checksum(user_id, &checksum)
                    .await?
                    .ok_or(error)?;
                Ok(IngestOutcome::Existing { id: winner.id })
            }
            Err(error) => Err(error),
        }
    }

    /// Push a fetched batch through the gate, one item at a time. A
    /// failing item never affects its siblings; created documents get
    /// detached tag and embed passes.
    pub async fn ingest_batch(
        &self,
        user_id: &str,
        source: SourceKind,
        items: Vec<ItemResult>,
    ) -> Vec<ImportReportItem> {
        let mut report = Vec::with_capacity(items.len());

        for item in items {
            let item = match item {
                Ok(item) => item,
                Err(error) => {
                    tracing::warn!(kind = %error.kind, reason = %error.reason, "Skipping failed item");
                    report.push(ImportReportItem::failed(
                        error.title.unwrap_or_else(|| "Unknown item".to_string()),
                        error.kind,
                        error.reason,
                    ));
                    continue;
                }
            };

            let outcome = match self
                .persist_if_new(
                    user_id,
                    &item.title,
                    item.url.as_deref(),
                    &item.text,
                    source,
                    item.metadata,
                )
                .await
            {
                Ok(outcome) => outcome,
                Err(error) => {
                    tracing::error!(error = %error, title = %item.title, "Item ingest failed");
                    IngestOutcome::Failed {
                        kind: error.kind(),
                        reason: error.to_string(),
                    }
                }
            };

            if let IngestOutcome::Created { id } = &outcome {
                self.spawn_enrichment(id.clone(), item.title.clone(), item.text.clone());
            }

            report.push(match outcome {
                IngestOutcome::Failed { kind, reason } => {
                    ImportReportItem::failed(item.title, kind, reason)
                }
                ok => ImportReportItem::ok(
                    ok.id().map(str::to_string),
                    item.title,
                    ok.status(),
                ),
            });
        }

        report
    }

    /// Detached tag + embed passes. The import response never waits on
    /// either; the sweeper covers embed failures.
    fn spawn_enrichment(&self, doc_id: String, title: String, text: String) {
        let db = Arc::clone(&self.db);
        let tagging = Arc::clone(&self.tagging);
        let pipeline = Arc::clone(&self.pipeline);

        tokio::spawn(async move {
            let tags = tagging.generate_tags(&title, &text).await;
            if !tags.is_empty() {
                if let Err(error) = db.update_document_tags(&doc_id, &tags).await {
                    tracing::warn!(doc_id, error = %error, "Failed to store tags");
                }
            }

            if let Err(error) = pipeline.embed_document(&doc_id).await {
                tracing::warn!(doc_id, error = %error, "Embed pass failed, sweeper will retry");
            }
        });
    }
}

/// SHA-256 hex digest of content, the dedup key.
pub fn content_checksum(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn truncate_content(text: &str) -> String {
    let cut: String = text.chars().take(TRUNCATION_LIMIT).collect();
    format!("{cut}{TRUNCATION_MARKER}")
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::config::{DatabaseConfig, EmbeddingsConfig, ProcessingConfig};
    use crate::db::{
        Database, DocumentStore, LibSqlBackend, SectionStore, SessionStore, TokenStore,
    };
    use crate::embeddings::EmbeddingProvider;
    use crate::llm::LlmProvider;
    use crate::models::{
        DocumentSummary, PendingDocument, Section, SectionMatch, Session, TokenBundle,
    };

    async fn libsql_backend() -> Arc<dyn DatabaseBackend> {
        let database = Database::new(
            &DatabaseConfig {
                url: ":memory:".to_string(),
                auth_token: None,
                local_path: None,
            },
            4,
        )
        .await
        .unwrap();
        Arc::new(LibSqlBackend::new(database))
    }

    fn service_over(db: Arc<dyn DatabaseBackend>) -> IngestService {
        let embeddings = Arc::new(
            EmbeddingProvider::new(&EmbeddingsConfig {
                model: "text-embedding-3-small".to_string(),
                dimensions: 4,
                api_key: None,
                base_url: Some("http://unreachable.invalid".to_string()),
                timeout_secs: 1,
                max_retries: 0,
            })
            .unwrap(),
        );
        let pipeline = Arc::new(EmbedPipeline::new(
            Arc::clone(&db),
            embeddings,
            &ProcessingConfig {
                chunk_size: 200,
                chunk_overlap: 50,
                embed_sweep_interval_secs: 60,
            },
        ));
        let tagging = Arc::new(TaggingService::new(LlmProvider::new(None)));

        IngestService::new(db, tagging, pipeline)
    }

    async fn setup() -> (IngestService, Arc<dyn DatabaseBackend>) {
        let db = libsql_backend().await;
        (service_over(Arc::clone(&db)), db)
    }

    /// Backend wrapper whose first `create_document` misbehaves, used to
    /// reach the truncation retry and insert-race recovery paths.
    struct MeddlingBackend {
        inner: Arc<dyn DatabaseBackend>,
        hook: CreateHook,
        fired: AtomicBool,
    }

    enum CreateHook {
        /// Reject the first insert with a non-constraint storage error.
        RejectFirstInsert,
        /// Insert a rival row with the same dedup key just before the
        /// first insert goes through, forcing a unique-constraint loss.
        InsertRivalFirst,
    }

    impl MeddlingBackend {
        fn over(inner: Arc<dyn DatabaseBackend>, hook: CreateHook) -> Arc<dyn DatabaseBackend> {
            Arc::new(Self {
                inner,
                hook,
                fired: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl DocumentStore for MeddlingBackend {
        async fn create_document(&self, doc: &Document) -> Result<()> {
            if !self.fired.swap(true, Ordering::SeqCst) {
                match self.hook {
                    CreateHook::RejectFirstInsert => {
                        return Err(MagpieError::Internal("row too large".to_string()));
                    }
                    CreateHook::InsertRivalFirst => {
                        let mut rival = doc.clone();
                        rival.id = "rival-doc".to_string();
                        self.inner.create_document(&rival).await?;
                    }
                }
            }
            self.inner.create_document(doc).await
        }

        async fn get_document_by_id(&self, user_id: &str, id: &str) -> Result<Option<Document>> {
            self.inner.get_document_by_id(user_id, id).await
        }

        async fn get_document(&self, id: &str) -> Result<Option<Document>> {
            self.inner.get_document(id).await
        }

        async fn get_documents_by_ids(
            &self,
            user_id: &str,
            ids: &[String],
        ) -> Result<Vec<Document>> {
            self.inner.get_documents_by_ids(user_id, ids).await
        }

        async fn find_document_by_checksum(
            &self,
            user_id: &str,
            checksum: &str,
        ) -> Result<Option<Document>> {
            self.inner.find_document_by_checksum(user_id, checksum).await
        }

        async fn find_document_by_url(&self, user_id: &str, url: &str) -> Result<Option<Document>> {
            self.inner.find_document_by_url(user_id, url).await
        }

        async fn list_documents(&self, user_id: &str, limit: u32) -> Result<Vec<DocumentSummary>> {
            self.inner.list_documents(user_id, limit).await
        }

        async fn update_document_tags(&self, id: &str, tags: &[String]) -> Result<()> {
            self.inner.update_document_tags(id, tags).await
        }

        async fn update_document_embedding(
            &self,
            id: &str,
            chunks: &[String],
            centroid: &[f32],
        ) -> Result<()> {
            self.inner.update_document_embedding(id, chunks, centroid).await
        }

        async fn get_pending_documents(&self, limit: u32) -> Result<Vec<PendingDocument>> {
            self.inner.get_pending_documents(limit).await
        }

        async fn pattern_search_documents(
            &self,
            user_id: &str,
            pattern: &str,
            limit: u32,
        ) -> Result<Vec<Document>> {
            self.inner.pattern_search_documents(user_id, pattern, limit).await
        }
    }

    #[async_trait]
    impl SectionStore for MeddlingBackend {
        async fn create_sections_batch(&self, sections: &[Section]) -> Result<()> {
            self.inner.create_sections_batch(sections).await
        }

        async fn delete_sections_by_document_id(&self, document_id: &str) -> Result<()> {
            self.inner.delete_sections_by_document_id(document_id).await
        }

        async fn match_sections(
            &self,
            user_id: &str,
            embedding: &[f32],
            threshold: f32,
            limit: u32,
        ) -> Result<Vec<SectionMatch>> {
            self.inner.match_sections(user_id, embedding, threshold, limit).await
        }

        async fn pattern_search_sections(
            &self,
            user_id: &str,
            pattern: &str,
            limit: u32,
        ) -> Result<Vec<SectionMatch>> {
            self.inner.pattern_search_sections(user_id, pattern, limit).await
        }
    }

    #[async_trait]
    impl SessionStore for MeddlingBackend {
        async fn create_session(&self, session: &Session) -> Result<()> {
            self.inner.create_session(session).await
        }

        async fn list_sessions(&self, user_id: &str, limit: u32) -> Result<Vec<Session>> {
            self.inner.list_sessions(user_id, limit).await
        }
    }

    #[async_trait]
    impl TokenStore for MeddlingBackend {
        async fn get_token_bundle(
            &self,
            user_id: &str,
            provider: &str,
        ) -> Result<Option<TokenBundle>> {
            self.inner.get_token_bundle(user_id, provider).await
        }

        async fn update_access_token(
            &self,
            user_id: &str,
            provider: &str,
            access_token: &str,
            expiry: chrono::DateTime<chrono::Utc>,
        ) -> Result<()> {
            self.inner
                .update_access_token(user_id, provider, access_token, expiry)
                .await
        }

        async fn upsert_token_bundle(&self, bundle: &TokenBundle) -> Result<()> {
            self.inner.upsert_token_bundle(bundle).await
        }
    }

    #[async_trait]
    impl DatabaseBackend for MeddlingBackend {
        async fn sync(&self) -> Result<()> {
            self.inner.sync().await
        }
    }

    #[test]
    fn test_checksum_is_deterministic() {
        assert_eq!(content_checksum("same text"), content_checksum("same text"));
        assert_ne!(content_checksum("same text"), content_checksum("other"));
        // Known digest of the empty string.
        assert_eq!(
            content_checksum(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_truncate_appends_marker() {
        let long = "x".repeat(TRUNCATION_LIMIT + 500);
        let truncated = truncate_content(&long);
        assert!(truncated.ends_with(TRUNCATION_MARKER));
        assert_eq!(
            truncated.chars().count(),
            TRUNCATION_LIMIT + TRUNCATION_MARKER.chars().count()
        );
    }

    #[tokio::test]
    async fn test_same_content_is_created_then_existing() {
        let (service, _db) = setup().await;

        let first = service
            .persist_if_new("u1", "Note", None, "identical text", SourceKind::Note, Metadata::new())
            .await
            .unwrap();
        let IngestOutcome::Created { id } = &first else {
            panic!("first import should create");
        };

        let second = service
            .persist_if_new("u1", "Renamed", None, "identical text", SourceKind::Note, Metadata::new())
            .await
            .unwrap();
        assert_eq!(
            second,
            IngestOutcome::Existing { id: id.clone() },
            "same content must not create a second document"
        );
    }

    #[tokio::test]
    async fn test_same_content_different_user_creates() {
        let (service, _db) = setup().await;

        service
            .persist_if_new("u1", "Note", None, "shared text", SourceKind::Note, Metadata::new())
            .await
            .unwrap();
        let other = service
            .persist_if_new("u2", "Note", None, "shared text", SourceKind::Note, Metadata::new())
            .await
            .unwrap();
        assert!(matches!(other, IngestOutcome::Created { .. }));
    }

    #[tokio::test]
    async fn test_url_identity_shortcuts_changed_content() {
        let (service, _db) = setup().await;
        let url = "https://docs.google.com/document/d/abc";

        let first = service
            .persist_if_new(
                "u1",
                "Doc",
                Some(url),
                "version one",
                SourceKind::GoogleDocs,
                Metadata::new(),
            )
            .await
            .unwrap();
        let IngestOutcome::Created { id } = first else {
            panic!("first import should create");
        };

        // Same url, edited content: still the same document for
        // url-keyed sources.
        let second = service
            .persist_if_new(
                "u1",
                "Doc",
                Some(url),
                "version two",
                SourceKind::GoogleDocs,
                Metadata::new(),
            )
            .await
            .unwrap();
        assert_eq!(second, IngestOutcome::Existing { id });
    }

    #[tokio::test]
    async fn test_url_is_not_identity_for_uploads() {
        let (service, _db) = setup().await;

        service
            .persist_if_new("u1", "a.md", None, "first note", SourceKind::Obsidian, Metadata::new())
            .await
            .unwrap();
        let second = service
            .persist_if_new("u1", "b.md", None, "second note", SourceKind::Obsidian, Metadata::new())
            .await
            .unwrap();
        assert!(matches!(second, IngestOutcome::Created { .. }));
    }

    #[tokio::test]
    async fn test_batch_isolates_item_failures() {
        use crate::sources::{ItemError, SourceItem};

        let (service, db) = setup().await;
        let items: Vec<ItemResult> = vec![
            Ok(SourceItem {
                title: "Good one".to_string(),
                url: None,
                text: "first document".to_string(),
                metadata: Metadata::new(),
            }),
            Err(ItemError {
                kind: ErrorKind::Content,
                reason: "empty".to_string(),
                title: Some("Broken".to_string()),
            }),
            Ok(SourceItem {
                title: "Good two".to_string(),
                url: None,
                text: "second document".to_string(),
                metadata: Metadata::new(),
            }),
        ];

        let report = service.ingest_batch("u1", SourceKind::Obsidian, items).await;
        assert_eq!(report.len(), 3);
        assert_eq!(report[0].status, ImportStatus::Created);
        assert_eq!(report[1].status, ImportStatus::Error);
        assert_eq!(report[1].title, "Broken");
        assert_eq!(report[1].error_type, Some(ErrorKind::Content));
        assert_eq!(report[1].reason.as_deref(), Some("empty"));
        assert_eq!(report[2].status, ImportStatus::Created);

        let docs = db.list_documents("u1", 10).await.unwrap();
        assert_eq!(docs.len(), 2);
    }

    #[tokio::test]
    async fn test_insert_failure_retries_truncated() {
        let inner = libsql_backend().await;
        let service = service_over(MeddlingBackend::over(
            Arc::clone(&inner),
            CreateHook::RejectFirstInsert,
        ));

        let long = "x".repeat(TRUNCATION_LIMIT + 500);
        let outcome = service
            .persist_if_new("u1", "Huge", None, &long, SourceKind::Note, Metadata::new())
            .await
            .unwrap();
        let IngestOutcome::Created { id } = outcome else {
            panic!("truncation retry should create");
        };

        let doc = inner.get_document(&id).await.unwrap().unwrap();
        assert!(doc.content.ends_with(TRUNCATION_MARKER));
        assert_eq!(
            doc.content.chars().count(),
            TRUNCATION_LIMIT + TRUNCATION_MARKER.chars().count()
        );
        assert_eq!(
            doc.metadata.get("truncated"),
            Some(&serde_json::json!(true))
        );
        assert_eq!(
            doc.metadata.get("original_length"),
            Some(&serde_json::json!(TRUNCATION_LIMIT + 500))
        );
        // The stored checksum keys the truncated content, so a re-import
        // of the same oversized text dedups against this row.
        assert_eq!(doc.checksum, content_checksum(&doc.content));
    }

    #[tokio::test]
    async fn test_insert_race_resolves_to_winner() {
        let inner = libsql_backend().await;
        let service = service_over(MeddlingBackend::over(
            Arc::clone(&inner),
            CreateHook::InsertRivalFirst,
        ));

        let outcome = service
            .persist_if_new(
                "u1",
                "Note",
                None,
                "contested text",
                SourceKind::Note,
                Metadata::new(),
            )
            .await
            .unwrap();
        assert_eq!(
            outcome,
            IngestOutcome::Existing {
                id: "rival-doc".to_string()
            },
            "losing an insert race must resolve to the winning row"
        );

        let docs = inner.list_documents("u1", 10).await.unwrap();
        assert_eq!(docs.len(), 1);
    }
}
