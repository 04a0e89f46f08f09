use std::sync::Arc;

use chrono::Utc;
use nanoid::nanoid;

use crate::config::ProcessingConfig;
use crate::db::DatabaseBackend;
use crate::embeddings::{centroid, EmbeddingProvider};
use crate::error::{MagpieError, Result};
use crate::models::Section;

use super::Chunker;

/// How many unfinished documents one sweep picks up.
const SWEEP_BATCH_SIZE: u32 = 20;

/// Chunk, embed, and index one document at a time. Runs detached after
/// ingest and again from the background sweeper for anything that failed.
pub struct EmbedPipeline {
    db: Arc<dyn DatabaseBackend>,
    embeddings: Arc<EmbeddingProvider>,
    chunker: Chunker,
}

impl EmbedPipeline {
    pub fn new(
        db: Arc<dyn DatabaseBackend>,
        embeddings: Arc<EmbeddingProvider>,
        config: &ProcessingConfig,
    ) -> Self {
        Self {
            db,
            embeddings,
            chunker: Chunker::new(config),
        }
    }

    /// Run the full embed pass for one document: chunk, batch-embed,
    /// centroid, then write sections + chunks + centroid back. Idempotent
    /// for already-embedded documents.
    pub async fn embed_document(&self, doc_id: &str) -> Result<()> {
        let doc = self
            .db
            .get_document(doc_id)
            .await?
            .ok_or_else(|| MagpieError::NotFound(format!("Document {doc_id} not found")))?;

        if doc.embedded {
            return Ok(());
        }

        let chunks = self.chunker.chunk(&doc.content);
        if chunks.is_empty() {
            return Err(MagpieError::Content(format!(
                "Document {doc_id} has no chunkable content"
            )));
        }

        let vectors = self.embeddings.embed(&chunks).await?;
        let doc_centroid = centroid(&vectors)?;

        let sections: Vec<Section> = chunks
            .iter()
            .zip(vectors)
            .enumerate()
            .map(|(position, (content, embedding))| Section {
                id: nanoid!(),
                document_id: doc.id.clone(),
                user_id: doc.user_id.clone(),
                position: position as u32,
                content: content.clone(),
                embedding,
                created_at: Utc::now(),
            })
            .collect();

        // A retried pass replaces any partial section set from a
        // previous failure, keeping sections parallel to chunks.
        self.db.delete_sections_by_document_id(&doc.id).await?;
        self.db.create_sections_batch(&sections).await?;
        self.db
            .update_document_embedding(&doc.id, &chunks, &doc_centroid)
            .await?;

        tracing::debug!(
            doc_id,
            sections = sections.len(),
            "Document embedded and indexed"
        );
        Ok(())
    }

    /// One sweep over documents whose embed pass never completed. Each
    /// failure is logged and skipped so one bad document cannot wedge
    /// the sweeper.
    pub async fn process_pending(&self) -> Result<usize> {
        let pending = self.db.get_pending_documents(SWEEP_BATCH_SIZE).await?;
        if pending.is_empty() {
            return Ok(0);
        }

        tracing::debug!(count = pending.len(), "Sweeping unembedded documents");

        let mut completed = 0;
        for doc in &pending {
            match self.embed_document(&doc.id).await {
                Ok(()) => completed += 1,
                Err(error) => {
                    tracing::warn!(doc_id = %doc.id, error = %error, "Embed pass failed, will retry next sweep");
                }
            }
        }

        Ok(completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatabaseConfig, EmbeddingsConfig};
    use crate::db::{Database, DocumentStore, LibSqlBackend, SectionStore};
    use crate::models::{Document, Metadata, SourceKind};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup_backend() -> Arc<dyn DatabaseBackend> {
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

    fn embeddings(base_url: &str) -> Arc<EmbeddingProvider> {
        Arc::new(
            EmbeddingProvider::new(&EmbeddingsConfig {
                model: "text-embedding-3-small".to_string(),
                dimensions: 4,
                api_key: Some("key".to_string()),
                base_url: Some(base_url.to_string()),
                timeout_secs: 5,
                max_retries: 0,
            })
            .unwrap(),
        )
    }

    fn processing_config() -> ProcessingConfig {
        ProcessingConfig {
            chunk_size: 200,
            chunk_overlap: 50,
            embed_sweep_interval_secs: 60,
        }
    }

    async fn insert_doc(db: &Arc<dyn DatabaseBackend>, id: &str, content: &str) {
        let doc = Document::new(
            id.to_string(),
            "u1".to_string(),
            "title".to_string(),
            None,
            content.to_string(),
            SourceKind::Note,
            format!("sum-{id}"),
            Metadata::new(),
        );
        db.create_document(&doc).await.unwrap();
    }

    #[tokio::test]
    async fn test_embed_document_backfills_sections_and_centroid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "embedding": [1.0, 0.0, 0.0, 0.0] }]
            })))
            .mount(&server)
            .await;

        let db = setup_backend().await;
        insert_doc(&db, "d1", "a short note about planning").await;

        let pipeline = EmbedPipeline::new(Arc::clone(&db), embeddings(&server.uri()), &processing_config());
        pipeline.embed_document("d1").await.unwrap();

        let doc = db.get_document("d1").await.unwrap().unwrap();
        assert!(doc.embedded);
        assert_eq!(doc.chunks.len(), 1);
        assert_eq!(doc.centroid.unwrap().len(), 4);

        let matches = db
            .match_sections("u1", &[1.0, 0.0, 0.0, 0.0], 0.3, 5)
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].document_id, "d1");
    }

    #[tokio::test]
    async fn test_embed_document_is_idempotent_once_embedded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "embedding": [1.0, 0.0, 0.0, 0.0] }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let db = setup_backend().await;
        insert_doc(&db, "d1", "some content").await;

        let pipeline = EmbedPipeline::new(Arc::clone(&db), embeddings(&server.uri()), &processing_config());
        pipeline.embed_document("d1").await.unwrap();
        pipeline.embed_document("d1").await.unwrap();
    }

    #[tokio::test]
    async fn test_process_pending_skips_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let db = setup_backend().await;
        insert_doc(&db, "d1", "content one").await;
        insert_doc(&db, "d2", "content two").await;

        let pipeline = EmbedPipeline::new(Arc::clone(&db), embeddings(&server.uri()), &processing_config());
        let completed = pipeline.process_pending().await.unwrap();
        assert_eq!(completed, 0);

        // Documents stay pending for the next sweep.
        let pending = db.get_pending_documents(10).await.unwrap();
        assert_eq!(pending.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_document_is_not_found() {
        let server = MockServer::start().await;
        let db = setup_backend().await;
        let pipeline = EmbedPipeline::new(db, embeddings(&server.uri()), &processing_config());

        let err = pipeline.embed_document("ghost").await.unwrap_err();
        assert!(matches!(err, MagpieError::NotFound(_)));
    }
}
