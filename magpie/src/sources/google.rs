use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::SourcesConfig;
use crate::error::{ErrorKind, MagpieError, Result};
use crate::models::{Metadata, SourceKind};

use super::{ItemError, ItemResult, SourceAdapter, SourceItem};

const DRIVE_BASE_URL: &str = "https://www.googleapis.com";
const DOCS_BASE_URL: &str = "https://docs.googleapis.com";

#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct GoogleDoc {
    title: Option<String>,
    body: Option<DocBody>,
}

#[derive(Debug, Deserialize)]
struct DocBody {
    #[serde(default)]
    content: Vec<StructuralElement>,
}

#[derive(Debug, Deserialize)]
struct StructuralElement {
    paragraph: Option<Paragraph>,
}

#[derive(Debug, Deserialize)]
struct Paragraph {
    #[serde(default)]
    elements: Vec<ParagraphElement>,
}

#[derive(Debug, Deserialize)]
struct ParagraphElement {
    #[serde(rename = "textRun")]
    text_run: Option<TextRun>,
}

#[derive(Debug, Deserialize)]
struct TextRun {
    content: Option<String>,
}

/// Google Docs adapter: Drive v3 enumeration plus Docs v1 body extraction.
pub struct GoogleDocsSource {
    client: reqwest::Client,
    drive_base: String,
    docs_base: String,
    access_token: String,
    page_size: u32,
    document_ids: Option<Vec<String>>,
}

impl GoogleDocsSource {
    pub fn new(
        config: &SourcesConfig,
        access_token: String,
        document_ids: Option<Vec<String>>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MagpieError::Internal(format!("Failed to create HTTP client: {e}")))?;

        let (drive_base, docs_base) = match &config.google_base_url {
            Some(base) => (base.clone(), base.clone()),
            None => (DRIVE_BASE_URL.to_string(), DOCS_BASE_URL.to_string()),
        };

        Ok(Self {
            client,
            drive_base,
            docs_base,
            access_token,
            page_size: config.google_page_size,
            document_ids,
        })
    }

    async fn list_document_ids(&self) -> Result<Vec<DriveFile>> {
        let url = format!("{}/drive/v3/files", self.drive_base);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[
                (
                    "q",
                    "mimeType='application/vnd.google-apps.document'".to_string(),
                ),
                ("pageSize", self.page_size.to_string()),
                ("fields", "files(id,name)".to_string()),
                ("orderBy", "modifiedTime desc".to_string()),
            ])
            .send()
            .await
            .map_err(|e| MagpieError::Source(format!("Drive list request failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            return Err(MagpieError::Auth(format!(
                "Google rejected credentials ({status}): {body}"
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MagpieError::Source(format!(
                "Drive list failed ({status}): {body}"
            )));
        }

        let list: DriveFileList = response
            .json()
            .await
            .map_err(|e| MagpieError::Source(format!("Invalid Drive list response: {e}")))?;
        Ok(list.files)
    }

    async fn fetch_document(&self, file_id: &str, known_title: Option<&str>) -> ItemResult {
        let url = format!("{}/v1/documents/{}", self.docs_base, file_id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| ItemError {
                kind: ErrorKind::Provider,
                reason: format!("Docs fetch failed: {e}"),
                title: known_title.map(str::to_string),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ItemError {
                kind: ErrorKind::Auth,
                reason: format!("Google rejected credentials ({status})"),
                title: known_title.map(str::to_string),
            });
        }
        if !status.is_success() {
            return Err(ItemError {
                kind: ErrorKind::Provider,
                reason: format!("Docs fetch failed ({status})"),
                title: known_title.map(str::to_string),
            });
        }

        let doc: GoogleDoc = response.json().await.map_err(|e| ItemError {
            kind: ErrorKind::Provider,
            reason: format!("Invalid Docs response: {e}"),
            title: known_title.map(str::to_string),
        })?;

        let title = doc
            .title
            .clone()
            .or_else(|| known_title.map(str::to_string))
            .unwrap_or_else(|| "Untitled document".to_string());

        let text = extract_text(&doc);
        if text.trim().is_empty() {
            return Err(ItemError {
                kind: ErrorKind::Content,
                reason: "Document has no extractable text".to_string(),
                title: Some(title),
            });
        }

        let mut metadata = Metadata::new();
        metadata.insert("file_id".to_string(), serde_json::json!(file_id));

        Ok(SourceItem {
            title,
            url: Some(format!("https://docs.google.com/document/d/{file_id}")),
            text,
            metadata,
        })
    }
}

#[async_trait]
impl SourceAdapter for GoogleDocsSource {
    fn kind(&self) -> SourceKind {
        SourceKind::GoogleDocs
    }

    async fn fetch(&self) -> Result<Vec<ItemResult>> {
        let targets: Vec<(String, Option<String>)> = match &self.document_ids {
            Some(ids) => ids.iter().map(|id| (id.clone(), None)).collect(),
            None => self
                .list_document_ids()
                .await?
                .into_iter()
                .map(|file| (file.id, Some(file.name)))
                .collect(),
        };

        let mut items = Vec::with_capacity(targets.len());
        for (file_id, name) in &targets {
            items.push(self.fetch_document(file_id, name.as_deref()).await);
        }
        Ok(items)
    }
}

/// Walk `body.content[].paragraph.elements[].textRun.content`.
fn extract_text(doc: &GoogleDoc) -> String {
    let Some(body) = &doc.body else {
        return String::new();
    };

    let mut text = String::new();
    for element in &body.content {
        let Some(paragraph) = &element.paragraph else {
            continue;
        };
        for part in &paragraph.elements {
            if let Some(content) = part.text_run.as_ref().and_then(|run| run.content.as_deref()) {
                text.push_str(content);
            }
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param_contains};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base: &str) -> SourcesConfig {
        SourcesConfig {
            google_page_size: 5,
            google_base_url: Some(base.to_string()),
            google_token_url: None,
            notion_base_url: None,
            notion_version: "2022-06-28".to_string(),
            gmail_base_url: None,
            timeout_secs: 5,
        }
    }

    fn doc_body(text: &str) -> serde_json::Value {
        json!({
            "title": "Fetched title",
            "body": {
                "content": [
                    { "sectionBreak": {} },
                    {
                        "paragraph": {
                            "elements": [
                                { "textRun": { "content": text } }
                            ]
                        }
                    }
                ]
            }
        })
    }

    #[tokio::test]
    async fn test_fetch_lists_then_extracts_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drive/v3/files"))
            .and(header("authorization", "Bearer at-1"))
            .and(query_param_contains("q", "vnd.google-apps.document"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "files": [{ "id": "doc-1", "name": "My doc" }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/documents/doc-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(doc_body("Hello world.\n")))
            .mount(&server)
            .await;

        let source = GoogleDocsSource::new(&config(&server.uri()), "at-1".to_string(), None).unwrap();
        let items = source.fetch().await.unwrap();
        assert_eq!(items.len(), 1);

        let item = items[0].as_ref().unwrap();
        assert_eq!(item.title, "Fetched title");
        assert_eq!(item.text, "Hello world.\n");
        assert_eq!(
            item.url.as_deref(),
            Some("https://docs.google.com/document/d/doc-1")
        );
    }

    #[tokio::test]
    async fn test_explicit_ids_skip_drive_listing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/documents/explicit-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(doc_body("content")))
            .mount(&server)
            .await;

        let source = GoogleDocsSource::new(
            &config(&server.uri()),
            "at-1".to_string(),
            Some(vec!["explicit-1".to_string()]),
        )
        .unwrap();
        let items = source.fetch().await.unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].is_ok());
    }

    #[tokio::test]
    async fn test_empty_document_is_per_item_content_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/documents/empty-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "title": "Empty",
                "body": { "content": [] }
            })))
            .mount(&server)
            .await;

        let source = GoogleDocsSource::new(
            &config(&server.uri()),
            "at-1".to_string(),
            Some(vec!["empty-1".to_string()]),
        )
        .unwrap();
        let items = source.fetch().await.unwrap();

        let err = items[0].as_ref().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Content);
    }

    #[tokio::test]
    async fn test_one_bad_document_never_aborts_siblings() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/documents/bad"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/documents/good"))
            .respond_with(ResponseTemplate::new(200).set_body_json(doc_body("fine")))
            .mount(&server)
            .await;

        let source = GoogleDocsSource::new(
            &config(&server.uri()),
            "at-1".to_string(),
            Some(vec!["bad".to_string(), "good".to_string()]),
        )
        .unwrap();
        let items = source.fetch().await.unwrap();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_err());
        assert!(items[1].is_ok());
    }

    #[tokio::test]
    async fn test_rejected_credentials_fail_the_whole_listing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drive/v3/files"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let source = GoogleDocsSource::new(&config(&server.uri()), "bad".to_string(), None).unwrap();
        let err = source.fetch().await.unwrap_err();
        assert!(matches!(err, MagpieError::Auth(_)));
    }
}
