use std::sync::Arc;
use std::sync::OnceLock;

use chrono::Utc;
use futures::StreamExt;
use nanoid::nanoid;
use regex::Regex;

use crate::db::DatabaseBackend;
use crate::error::Result;
use crate::llm::{prompts, LlmProvider};
use crate::models::{SearchMode, Session, SourceRef};

use super::search::SearchService;

/// One answer request, resolved either from retrieval or from
/// caller-supplied sources.
#[derive(Debug, Clone)]
pub struct AnswerRequest {
    pub user_id: String,
    pub question: String,
    /// Pre-retrieved sources; skips the retrieval step when present.
    pub sources: Option<Vec<SourceRef>>,
    /// Pre-computed answer; skips generation when present.
    pub answer: Option<String>,
    pub memory_enabled: bool,
}

/// Streams grounded answers as NDJSON frames and persists the finished
/// exchange as a session.
pub struct AnswerService {
    db: Arc<dyn DatabaseBackend>,
    search: Arc<SearchService>,
    llm: LlmProvider,
    source_limit: usize,
}

impl AnswerService {
    pub fn new(
        db: Arc<dyn DatabaseBackend>,
        search: Arc<SearchService>,
        llm: LlmProvider,
        source_limit: usize,
    ) -> Self {
        Self {
            db,
            search,
            llm,
            source_limit,
        }
    }

    /// NDJSON frame stream for one question. Frame order is fixed:
    /// `{"sources": [...]}` first, then zero or more `{"delta": "..."}`,
    /// an `{"error": ...}` frame on failure, and finally `{"done": true}`.
    /// Dropping the stream abandons generation and skips persistence.
    pub fn answer_stream(
        self: Arc<Self>,
        request: AnswerRequest,
    ) -> impl futures::Stream<Item = String> + Send {
        async_stream::stream! {
            let sources = match self.resolve_sources(&request).await {
                Ok(sources) => sources,
                Err(error) => {
                    tracing::error!(error = %error, "Source retrieval failed");
                    yield frame(serde_json::json!({ "sources": [] }));
                    yield error_frame(&error);
                    yield frame(serde_json::json!({ "done": true }));
                    return;
                }
            };

            yield frame(serde_json::json!({ "sources": sources }));

            let mut answer = String::new();
            let mut failed = false;

            if let Some(precomputed) = &request.answer {
                answer = precomputed.clone();
                yield frame(serde_json::json!({ "delta": precomputed }));
            } else {
                let excerpts: Vec<(String, String)> = sources
                    .iter()
                    .map(|s| (s.title.clone(), s.content.clone()))
                    .collect();
                let prompt = prompts::answer_prompt(&request.question, &excerpts);

                match self
                    .llm
                    .complete_stream(&prompt, Some(prompts::answer_system_prompt()), None)
                    .await
                {
                    Ok(mut deltas) => {
                        while let Some(delta) = deltas.next().await {
                            match delta {
                                Ok(text) => {
                                    answer.push_str(&text);
                                    yield frame(serde_json::json!({ "delta": text }));
                                }
                                Err(error) => {
                                    tracing::error!(error = %error, "Answer stream failed mid-generation");
                                    yield error_frame(&error);
                                    failed = true;
                                    break;
                                }
                            }
                        }
                    }
                    Err(error) => {
                        tracing::error!(error = %error, "Answer generation unavailable");
                        yield error_frame(&error);
                        failed = true;
                    }
                }
            }

            if request.memory_enabled && !failed && !answer.is_empty() {
                self.persist_session(&request, sources, answer).await;
            }

            yield frame(serde_json::json!({ "done": true }));
        }
    }

    async fn resolve_sources(&self, request: &AnswerRequest) -> Result<Vec<SourceRef>> {
        if let Some(sources) = &request.sources {
            return Ok(sources
                .iter()
                .map(|s| SourceRef {
                    content: sanitize(&s.content),
                    ..s.clone()
                })
                .collect());
        }

        let hits = self
            .search
            .search(&request.user_id, &request.question, SearchMode::Similarity)
            .await?;

        Ok(hits
            .into_iter()
            .take(self.source_limit)
            .map(|hit| {
                let excerpt = hit
                    .relevant_sections
                    .first()
                    .map(|section| section.content.clone())
                    .or(hit.content)
                    .unwrap_or_default();
                SourceRef {
                    source: hit.source,
                    title: hit.title,
                    content: sanitize(&excerpt),
                    url: hit.url,
                    doc_type: "document".to_string(),
                }
            })
            .collect())
    }

    /// Session persistence is best-effort; a storage failure never
    /// reaches the client.
    async fn persist_session(&self, request: &AnswerRequest, sources: Vec<SourceRef>, answer: String) {
        let session = Session {
            id: nanoid!(),
            user_id: request.user_id.clone(),
            query: request.question.clone(),
            response: answer,
            sources,
            created_at: Utc::now(),
        };

        if let Err(error) = self.db.create_session(&session).await {
            tracing::warn!(error = %error, user_id = %request.user_id, "Failed to persist session");
        }
    }
}

fn frame(value: serde_json::Value) -> String {
    let mut line = value.to_string();
    line.push('\n');
    line
}

fn error_frame(error: &crate::error::MagpieError) -> String {
    frame(serde_json::json!({
        "error": error.to_string(),
        "errorType": error.kind(),
    }))
}

static SANITIZE_RE: OnceLock<Regex> = OnceLock::new();

/// Collapse runs of whitespace and control characters to single spaces.
/// Source excerpts go into prompts and NDJSON frames; stray control
/// characters break both.
pub fn sanitize(text: &str) -> String {
    let re = SANITIZE_RE
        .get_or_init(|| Regex::new(r"[\s\x00-\x08\x0B-\x1F\x7F]+").expect("valid pattern"));
    re.replace_all(text, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatabaseConfig, EmbeddingsConfig, RetrievalConfig};
    use crate::db::{Database, LibSqlBackend, SessionStore};
    use crate::embeddings::EmbeddingProvider;
    use crate::models::SourceKind;

    fn test_sources() -> Vec<SourceRef> {
        vec![SourceRef {
            source: SourceKind::Notion,
            title: "Plan".to_string(),
            content: "the\tplan\n\ncontent".to_string(),
            url: None,
            doc_type: "document".to_string(),
        }]
    }

    async fn setup() -> (Arc<AnswerService>, Arc<dyn DatabaseBackend>) {
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
        let db: Arc<dyn DatabaseBackend> = Arc::new(LibSqlBackend::new(database));

        let embeddings = Arc::new(
            EmbeddingProvider::new(&EmbeddingsConfig {
                model: "text-embedding-3-small".to_string(),
                dimensions: 4,
                api_key: Some("key".to_string()),
                base_url: Some("http://unreachable.invalid".to_string()),
                timeout_secs: 1,
                max_retries: 0,
            })
            .unwrap(),
        );
        let search = Arc::new(SearchService::new(
            Arc::clone(&db),
            embeddings,
            RetrievalConfig {
                similarity_threshold: 0.3,
                similarity_limit: 5,
                pattern_document_limit: 5,
                pattern_section_limit: 10,
                answer_source_limit: 3,
            },
        ));

        let service = Arc::new(AnswerService::new(
            Arc::clone(&db),
            search,
            LlmProvider::new(None),
            3,
        ));
        (service, db)
    }

    async fn collect_frames(
        service: Arc<AnswerService>,
        request: AnswerRequest,
    ) -> Vec<serde_json::Value> {
        let frames: Vec<String> = service.answer_stream(request).collect().await;
        frames
            .iter()
            .map(|line| serde_json::from_str(line.trim()).expect("each frame is one JSON line"))
            .collect()
    }

    #[test]
    fn test_sanitize_collapses_whitespace_and_control_runs() {
        assert_eq!(sanitize("a\t\tb\n\nc"), "a b c");
        assert_eq!(sanitize("  padded  "), "padded");
        assert_eq!(sanitize("nul\u{0000}byte"), "nul byte");
        assert_eq!(sanitize(""), "");
    }

    #[tokio::test]
    async fn test_precomputed_answer_streams_sources_delta_done() {
        let (service, db) = setup().await;

        let frames = collect_frames(
            service,
            AnswerRequest {
                user_id: "u1".to_string(),
                question: "what is the plan?".to_string(),
                sources: Some(test_sources()),
                answer: Some("The plan is set.".to_string()),
                memory_enabled: true,
            },
        )
        .await;

        assert_eq!(frames.len(), 3);
        let sources = frames[0]["sources"].as_array().unwrap();
        assert_eq!(sources[0]["content"], "the plan content");
        assert_eq!(frames[1]["delta"], "The plan is set.");
        assert_eq!(frames[2]["done"], true);

        let sessions = db.list_sessions("u1", 10).await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].response, "The plan is set.");
        assert_eq!(sessions[0].sources.len(), 1);
    }

    #[tokio::test]
    async fn test_memory_disabled_skips_session() {
        let (service, db) = setup().await;

        collect_frames(
            service,
            AnswerRequest {
                user_id: "u1".to_string(),
                question: "q".to_string(),
                sources: Some(test_sources()),
                answer: Some("a".to_string()),
                memory_enabled: false,
            },
        )
        .await;

        assert!(db.list_sessions("u1", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_llm_emits_error_frame_before_done() {
        let (service, db) = setup().await;

        let frames = collect_frames(
            service,
            AnswerRequest {
                user_id: "u1".to_string(),
                question: "q".to_string(),
                sources: Some(test_sources()),
                answer: None,
                memory_enabled: true,
            },
        )
        .await;

        assert_eq!(frames.len(), 3);
        assert!(frames[0]["sources"].is_array());
        assert!(frames[1]["error"].is_string());
        assert!(frames[1]["errorType"].is_string());
        assert_eq!(frames[2]["done"], true);

        // No session for a failed generation.
        assert!(db.list_sessions("u1", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_retrieval_failure_still_closes_the_stream() {
        // No caller-supplied sources and an unreachable embedding API.
        let (service, _db) = setup().await;

        let frames = collect_frames(
            service,
            AnswerRequest {
                user_id: "u1".to_string(),
                question: "q".to_string(),
                sources: None,
                answer: None,
                memory_enabled: true,
            },
        )
        .await;

        assert!(frames.iter().any(|f| f.get("error").is_some()));
        assert_eq!(frames.last().unwrap()["done"], true);
    }
}
