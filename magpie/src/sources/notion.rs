use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::SourcesConfig;
use crate::error::{ErrorKind, MagpieError, Result};
use crate::models::{Metadata, SourceKind};

use super::blocks::{render_blocks, Block};
use super::{ItemError, ItemResult, SourceAdapter, SourceItem};

const NOTION_BASE_URL: &str = "https://api.notion.com";
const BLOCK_PAGE_SIZE: u32 = 100;
const MAX_BLOCK_DEPTH: usize = 8;

/// Notion adapter: workspace search plus a recursive block-children walk.
pub struct NotionSource {
    client: reqwest::Client,
    base_url: String,
    version: String,
    access_token: String,
}

impl NotionSource {
    pub fn new(config: &SourcesConfig, access_token: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MagpieError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config
                .notion_base_url
                .clone()
                .unwrap_or_else(|| NOTION_BASE_URL.to_string()),
            version: config.notion_version.clone(),
            access_token,
        })
    }

    async fn search_pages(&self) -> Result<Vec<Value>> {
        let url = format!("{}/v1/search", self.base_url);
        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut body = serde_json::json!({
                "filter": { "property": "object", "value": "page" }
            });
            if let Some(ref c) = cursor {
                body["start_cursor"] = serde_json::json!(c);
            }

            let response = self
                .client
                .post(&url)
                .bearer_auth(&self.access_token)
                .header("Notion-Version", &self.version)
                .json(&body)
                .send()
                .await
                .map_err(|e| MagpieError::Source(format!("Notion search failed: {e}")))?;

            let status = response.status();
            if status == reqwest::StatusCode::UNAUTHORIZED
                || status == reqwest::StatusCode::FORBIDDEN
            {
                let body = response.text().await.unwrap_or_default();
                return Err(MagpieError::Auth(format!(
                    "Notion rejected credentials ({status}): {body}"
                )));
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(MagpieError::Source(format!(
                    "Notion search failed ({status}): {body}"
                )));
            }

            let payload: Value = response
                .json()
                .await
                .map_err(|e| MagpieError::Source(format!("Invalid Notion search response: {e}")))?;

            if let Some(results) = payload["results"].as_array() {
                pages.extend(results.iter().cloned());
            }

            if payload["has_more"].as_bool().unwrap_or(false) {
                cursor = payload["next_cursor"].as_str().map(str::to_string);
                if cursor.is_none() {
                    break;
                }
            } else {
                break;
            }
        }

        Ok(pages)
    }

    async fn fetch_blocks(&self, block_id: &str, depth: usize) -> Result<Vec<Block>> {
        if depth >= MAX_BLOCK_DEPTH {
            return Ok(Vec::new());
        }

        let url = format!("{}/v1/blocks/{}/children", self.base_url, block_id);
        let mut blocks = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(&url)
                .bearer_auth(&self.access_token)
                .header("Notion-Version", &self.version)
                .query(&[("page_size", BLOCK_PAGE_SIZE.to_string())]);
            if let Some(ref c) = cursor {
                request = request.query(&[("start_cursor", c.clone())]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| MagpieError::Source(format!("Notion block fetch failed: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(MagpieError::Source(format!(
                    "Notion block fetch failed ({status}): {body}"
                )));
            }

            let payload: Value = response.json().await.map_err(|e| {
                MagpieError::Source(format!("Invalid Notion block response: {e}"))
            })?;

            if let Some(results) = payload["results"].as_array() {
                for raw in results {
                    blocks.push(self.parse_block(raw, depth).await?);
                }
            }

            if payload["has_more"].as_bool().unwrap_or(false) {
                cursor = payload["next_cursor"].as_str().map(str::to_string);
                if cursor.is_none() {
                    break;
                }
            } else {
                break;
            }
        }

        Ok(blocks)
    }

    /// Recursion over child blocks needs boxing; async fns cannot
    /// self-reference otherwise.
    fn parse_block<'a>(
        &'a self,
        raw: &'a Value,
        depth: usize,
    ) -> futures::future::BoxFuture<'a, Result<Block>> {
        Box::pin(async move {
            let kind = raw["type"].as_str().unwrap_or("unknown");
            let text = rich_text(&raw[kind]["rich_text"]);
            let has_children = raw["has_children"].as_bool().unwrap_or(false);

            let children = if has_children
                && matches!(
                    kind,
                    "bulleted_list_item" | "numbered_list_item" | "toggle"
                ) {
                let id = raw["id"].as_str().unwrap_or_default();
                self.fetch_blocks(id, depth + 1).await?
            } else {
                Vec::new()
            };

            Ok(match kind {
                "paragraph" => Block::Paragraph { text },
                "heading_1" => Block::Heading1 { text },
                "heading_2" => Block::Heading2 { text },
                "heading_3" => Block::Heading3 { text },
                "bulleted_list_item" => Block::BulletedListItem { text, children },
                "numbered_list_item" => Block::NumberedListItem { text, children },
                "to_do" => Block::ToDo {
                    text,
                    checked: raw["to_do"]["checked"].as_bool().unwrap_or(false),
                },
                "toggle" => Block::Toggle { text, children },
                "quote" => Block::Quote { text },
                "code" => Block::Code {
                    text,
                    language: raw["code"]["language"]
                        .as_str()
                        .unwrap_or_default()
                        .to_string(),
                },
                "callout" => Block::Callout { text },
                "image" => Block::Image {
                    caption: rich_text(&raw["image"]["caption"]),
                },
                "video" => Block::Video {
                    caption: rich_text(&raw["video"]["caption"]),
                },
                "equation" => Block::Equation {
                    expression: raw["equation"]["expression"]
                        .as_str()
                        .unwrap_or_default()
                        .to_string(),
                },
                "divider" => Block::Divider,
                "unsupported" => Block::Unsupported {
                    kind: "unsupported".to_string(),
                },
                other => Block::Unsupported {
                    kind: other.to_string(),
                },
            })
        })
    }

    async fn fetch_page(&self, page: &Value) -> ItemResult {
        let page_id = page["id"].as_str().unwrap_or_default().to_string();
        let title = page_title(page);

        let blocks = self
            .fetch_blocks(&page_id, 0)
            .await
            .map_err(|e| ItemError {
                kind: e.kind(),
                reason: e.to_string(),
                title: Some(title.clone()),
            })?;

        let text = render_blocks(&blocks);
        if text.trim().is_empty() {
            return Err(ItemError {
                kind: ErrorKind::Content,
                reason: "Page has no extractable text".to_string(),
                title: Some(title),
            });
        }

        let mut metadata = Metadata::new();
        metadata.insert("page_id".to_string(), serde_json::json!(page_id));

        Ok(SourceItem {
            title,
            url: page["url"].as_str().map(str::to_string),
            text,
            metadata,
        })
    }
}

#[async_trait]
impl SourceAdapter for NotionSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Notion
    }

    async fn fetch(&self) -> Result<Vec<ItemResult>> {
        let pages = self.search_pages().await?;

        let mut items = Vec::with_capacity(pages.len());
        for page in &pages {
            items.push(self.fetch_page(page).await);
        }
        Ok(items)
    }
}

/// Join the `plain_text` runs of a rich-text array.
fn rich_text(value: &Value) -> String {
    value
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part["plain_text"].as_str())
                .collect::<String>()
        })
        .unwrap_or_default()
}

/// Pages expose their title as the sole property of type `title`.
fn page_title(page: &Value) -> String {
    let title = page["properties"]
        .as_object()
        .and_then(|props| {
            props
                .values()
                .find(|prop| prop["type"].as_str() == Some("title"))
        })
        .map(|prop| rich_text(&prop["title"]))
        .unwrap_or_default();

    if title.is_empty() {
        "Untitled page".to_string()
    } else {
        title
    }
}
