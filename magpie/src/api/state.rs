use std::sync::Arc;

use crate::config::Config;
use crate::db::DatabaseBackend;
use crate::embeddings::EmbeddingProvider;
use crate::error::Result;
use crate::llm::LlmProvider;
use crate::oauth::TokenService;
use crate::processing::EmbedPipeline;
use crate::services::{AnswerService, IngestService, NotifyService, SearchService, TaggingService};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<dyn DatabaseBackend>,
    pub embeddings: Arc<EmbeddingProvider>,
    pub llm: LlmProvider,
    pub tokens: TokenService,
    pub search: Arc<SearchService>,
    pub ingest: Arc<IngestService>,
    pub answer: Arc<AnswerService>,
    pub pipeline: Arc<EmbedPipeline>,
    pub notify: Option<NotifyService>,
}

impl AppState {
    pub fn new(
        config: Config,
        db: Arc<dyn DatabaseBackend>,
        embeddings: Arc<EmbeddingProvider>,
        llm: LlmProvider,
    ) -> Result<Self> {
        let config = Arc::new(config);

        let tokens = TokenService::new(Arc::clone(&db), &config.sources)?;
        let pipeline = Arc::new(EmbedPipeline::new(
            Arc::clone(&db),
            Arc::clone(&embeddings),
            &config.processing,
        ));
        let tagging = Arc::new(TaggingService::new(llm.clone()));
        let ingest = Arc::new(IngestService::new(
            Arc::clone(&db),
            tagging,
            Arc::clone(&pipeline),
        ));
        let search = Arc::new(SearchService::new(
            Arc::clone(&db),
            Arc::clone(&embeddings),
            config.retrieval.clone(),
        ));
        let answer = Arc::new(AnswerService::new(
            Arc::clone(&db),
            Arc::clone(&search),
            llm.clone(),
            config.retrieval.answer_source_limit,
        ));
        let notify = config
            .notify
            .as_ref()
            .map(NotifyService::new)
            .transpose()?;

        Ok(Self {
            config,
            db,
            embeddings,
            llm,
            tokens,
            search,
            ingest,
            answer,
            pipeline,
            notify,
        })
    }
}
