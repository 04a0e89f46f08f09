use std::collections::HashMap;
use std::sync::Arc;

use crate::config::RetrievalConfig;
use crate::db::DatabaseBackend;
use crate::embeddings::EmbeddingProvider;
use crate::error::{MagpieError, Result};
use crate::models::{Document, DocumentHit, RelevantSection, SearchMode, SectionMatch};

/// Read-only retrieval over a user's indexed documents.
pub struct SearchService {
    db: Arc<dyn DatabaseBackend>,
    embeddings: Arc<EmbeddingProvider>,
    config: RetrievalConfig,
}

impl SearchService {
    pub fn new(
        db: Arc<dyn DatabaseBackend>,
        embeddings: Arc<EmbeddingProvider>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            db,
            embeddings,
            config,
        }
    }

    pub async fn search(
        &self,
        user_id: &str,
        query: &str,
        mode: SearchMode,
    ) -> Result<Vec<DocumentHit>> {
        if query.trim().is_empty() {
            return Err(MagpieError::Validation("Query cannot be empty".to_string()));
        }

        match mode {
            SearchMode::Similarity => self.similarity_search(user_id, query).await,
            SearchMode::Pattern => self.pattern_search(user_id, query).await,
        }
    }

    /// Embed the query and match sections by cosine similarity, then
    /// fold matches into their parent documents in best-match order.
    async fn similarity_search(&self, user_id: &str, query: &str) -> Result<Vec<DocumentHit>> {
        let query_embedding = self.embeddings.embed_query(query).await?;

        let matches = self
            .db
            .match_sections(
                user_id,
                &query_embedding,
                self.config.similarity_threshold,
                self.config.similarity_limit,
            )
            .await?;

        self.hits_from_matches(user_id, matches).await
    }

    /// Case-insensitive substring match over documents and sections,
    /// unioned without duplicates.
    async fn pattern_search(&self, user_id: &str, query: &str) -> Result<Vec<DocumentHit>> {
        let doc_matches = self
            .db
            .pattern_search_documents(user_id, query, self.config.pattern_document_limit)
            .await?;
        let section_matches = self
            .db
            .pattern_search_sections(user_id, query, self.config.pattern_section_limit)
            .await?;

        let mut ordered_ids: Vec<String> = Vec::new();
        let mut docs_by_id: HashMap<String, Document> = HashMap::new();
        for doc in doc_matches {
            if !docs_by_id.contains_key(&doc.id) {
                ordered_ids.push(doc.id.clone());
                docs_by_id.insert(doc.id.clone(), doc);
            }
        }

        let mut sections_by_doc: HashMap<String, Vec<RelevantSection>> = HashMap::new();
        for section in &section_matches {
            if !docs_by_id.contains_key(&section.document_id)
                && !ordered_ids.contains(&section.document_id)
            {
                ordered_ids.push(section.document_id.clone());
            }
            sections_by_doc
                .entry(section.document_id.clone())
                .or_default()
                .push(RelevantSection {
                    content: section.content.clone(),
                    similarity: None,
                });
        }

        // Section matches can point at documents the content LIKE missed.
        let missing: Vec<String> = ordered_ids
            .iter()
            .filter(|id| !docs_by_id.contains_key(*id))
            .cloned()
            .collect();
        if !missing.is_empty() {
            for doc in self.db.get_documents_by_ids(user_id, &missing).await? {
                docs_by_id.insert(doc.id.clone(), doc);
            }
        }

        let hits = ordered_ids
            .into_iter()
            .filter_map(|id| {
                let doc = docs_by_id.remove(&id)?;
                let relevant_sections = sections_by_doc.remove(&id).unwrap_or_default();
                Some(hit_from_document(doc, relevant_sections))
            })
            .collect();
        Ok(hits)
    }

    async fn hits_from_matches(
        &self,
        user_id: &str,
        matches: Vec<SectionMatch>,
    ) -> Result<Vec<DocumentHit>> {
        let mut ordered_ids: Vec<String> = Vec::new();
        let mut sections_by_doc: HashMap<String, Vec<RelevantSection>> = HashMap::new();

        for section in &matches {
            if !ordered_ids.contains(&section.document_id) {
                ordered_ids.push(section.document_id.clone());
            }
            sections_by_doc
                .entry(section.document_id.clone())
                .or_default()
                .push(RelevantSection {
                    content: section.content.clone(),
                    similarity: section.similarity,
                });
        }

        if ordered_ids.is_empty() {
            return Ok(Vec::new());
        }

        let documents = self.db.get_documents_by_ids(user_id, &ordered_ids).await?;
        let mut docs_by_id: HashMap<String, Document> =
            documents.into_iter().map(|d| (d.id.clone(), d)).collect();

        let hits = ordered_ids
            .into_iter()
            .filter_map(|id| {
                let doc = docs_by_id.remove(&id)?;
                let relevant_sections = sections_by_doc.remove(&id).unwrap_or_default();
                Some(hit_from_document(doc, relevant_sections))
            })
            .collect();
        Ok(hits)
    }
}

fn hit_from_document(doc: Document, relevant_sections: Vec<RelevantSection>) -> DocumentHit {
    DocumentHit {
        id: doc.id,
        title: doc.title,
        url: doc.url,
        content: Some(doc.content),
        source: doc.source,
        tags: doc.tags,
        relevant_sections,
    }
}
