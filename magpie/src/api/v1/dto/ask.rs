//! Ask request DTO for the v1 API.
//!
//! The ask endpoint streams NDJSON frames rather than returning a JSON
//! envelope, so there is no response DTO here; the frame shapes live in
//! the answer service.

use serde::Deserialize;

use crate::models::SourceRef;
use crate::services::AnswerRequest;

fn default_true() -> bool {
    true
}

/// Request body for `POST /v1/ask`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AskRequest {
    /// User whose documents ground the answer.
    pub user_id: String,
    /// The question to answer.
    pub q: String,
    /// Caller-provided sources. When present, retrieval is skipped and
    /// these are used verbatim (after sanitization).
    pub sources: Option<Vec<SourceRef>>,
    /// Precomputed answer. When present, the LLM is skipped and this is
    /// emitted as a single delta frame.
    pub answer: Option<String>,
    /// Persist the completed exchange as a session (default: true).
    #[serde(default = "default_true")]
    pub memory_enabled: bool,
}

impl From<AskRequest> for AnswerRequest {
    fn from(req: AskRequest) -> Self {
        Self {
            user_id: req.user_id,
            question: req.q,
            sources: req.sources,
            answer: req.answer,
            memory_enabled: req.memory_enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_enabled_defaults_on() {
        let json = r#"{"userId": "u1", "q": "what did I write about rust?"}"#;
        let req: AskRequest = serde_json::from_str(json).expect("deserialize");
        assert!(req.memory_enabled);
        assert!(req.sources.is_none());
        assert!(req.answer.is_none());
    }

    #[test]
    fn memory_enabled_can_be_disabled() {
        let json = r#"{"userId": "u1", "q": "hi", "memoryEnabled": false}"#;
        let req: AskRequest = serde_json::from_str(json).expect("deserialize");
        assert!(!req.memory_enabled);
    }
}
