use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type Metadata = HashMap<String, serde_json::Value>;

/// Origin of an ingested document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    GoogleDocs,
    Notion,
    Obsidian,
    Gmail,
    #[default]
    Note,
}

impl SourceKind {
    /// Sources whose document URL is a stable external identity. For
    /// these, `(user_id, url)` participates in dedup alongside the
    /// content checksum.
    pub fn url_is_identity(&self) -> bool {
        matches!(self, Self::GoogleDocs | Self::Notion)
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GoogleDocs => write!(f, "google_docs"),
            Self::Notion => write!(f, "notion"),
            Self::Obsidian => write!(f, "obsidian"),
            Self::Gmail => write!(f, "gmail"),
            Self::Note => write!(f, "note"),
        }
    }
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "google_docs" | "google-docs" => Ok(Self::GoogleDocs),
            "notion" => Ok(Self::Notion),
            "obsidian" => Ok(Self::Obsidian),
            "gmail" => Ok(Self::Gmail),
            "note" => Ok(Self::Note),
            _ => Err(format!("Unknown source: {s}")),
        }
    }
}

/// Outcome of one item in an import batch. Errors are captured here and
/// never abort sibling items.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    Created,
    Existing,
    Error,
}

impl std::fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Existing => write!(f, "existing"),
            Self::Error => write!(f, "error"),
        }
    }
}
