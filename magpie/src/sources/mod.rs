pub mod blocks;
pub mod gmail;
pub mod google;
pub mod notion;
pub mod obsidian;

use async_trait::async_trait;

use crate::error::{ErrorKind, Result};
use crate::models::{Metadata, SourceKind};

pub use blocks::{render_blocks, Block};
pub use gmail::GmailSource;
pub use google::GoogleDocsSource;
pub use notion::NotionSource;
pub use obsidian::ObsidianSource;

/// One fetched item, normalized to plain text.
#[derive(Debug, Clone)]
pub struct SourceItem {
    pub title: String,
    pub url: Option<String>,
    pub text: String,
    pub metadata: Metadata,
}

/// A single item's failure. Never aborts sibling items.
#[derive(Debug, Clone)]
pub struct ItemError {
    pub kind: ErrorKind,
    pub reason: String,
    /// Best-effort title for reporting, when known.
    pub title: Option<String>,
}

pub type ItemResult = std::result::Result<SourceItem, ItemError>;

/// A connected content source. `fetch` fails only when the source as a
/// whole is unreachable; individual item failures come back inline.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn kind(&self) -> SourceKind;
    async fn fetch(&self) -> Result<Vec<ItemResult>>;
}
