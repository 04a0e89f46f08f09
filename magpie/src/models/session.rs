use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SourceKind;

/// One persisted query/answer/sources record. Written once per completed
/// query when the caller has memory enabled; never mutated; not deduped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub query: String,
    pub response: String,
    pub sources: Vec<SourceRef>,
    pub created_at: DateTime<Utc>,
}

/// A source actually surfaced to the caller in an answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SourceRef {
    pub source: SourceKind,
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub doc_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_ref_wire_shape() {
        let source = SourceRef {
            source: SourceKind::Notion,
            title: "Q3 plan".to_string(),
            content: "plan excerpt".to_string(),
            url: None,
            doc_type: "document".to_string(),
        };

        let json = serde_json::to_value(&source).expect("serialize");
        assert_eq!(json["source"], "notion");
        assert_eq!(json["type"], "document");
        assert!(json.get("docType").is_none());
        assert!(json.get("url").is_none());
    }
}
