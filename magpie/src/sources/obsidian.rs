use async_trait::async_trait;

use crate::error::{ErrorKind, Result};
use crate::models::{Metadata, SourceKind};

use super::{ItemError, ItemResult, SourceAdapter, SourceItem};

/// An uploaded vault file, already read client-side.
#[derive(Debug, Clone)]
pub struct ObsidianFile {
    pub name: String,
    pub content: String,
}

/// Obsidian adapter: pass-through of client-uploaded markdown. No
/// network access; empty files surface as per-item content errors.
pub struct ObsidianSource {
    files: Vec<ObsidianFile>,
}

impl ObsidianSource {
    pub fn new(files: Vec<ObsidianFile>) -> Self {
        Self { files }
    }
}

#[async_trait]
impl SourceAdapter for ObsidianSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Obsidian
    }

    async fn fetch(&self) -> Result<Vec<ItemResult>> {
        let items = self
            .files
            .iter()
            .map(|file| {
                if file.content.trim().is_empty() {
                    return Err(ItemError {
                        kind: ErrorKind::Content,
                        reason: "File is empty".to_string(),
                        title: Some(file.name.clone()),
                    });
                }

                let title = file
                    .name
                    .strip_suffix(".md")
                    .unwrap_or(&file.name)
                    .to_string();

                let mut metadata = Metadata::new();
                metadata.insert("file_name".to_string(), serde_json::json!(file.name));

                Ok(SourceItem {
                    title,
                    url: None,
                    text: file.content.clone(),
                    metadata,
                })
            })
            .collect();

        Ok(items)
    }
}
