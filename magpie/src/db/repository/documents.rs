use chrono::{DateTime, Utc};
use libsql::{params, Connection};

use crate::error::Result;
use crate::models::{Document, DocumentSummary, PendingDocument, SourceKind};

/// Decode an F32_BLOB column into a float vector.
pub(crate) fn blob_to_vector(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

pub struct DocumentRepository;

impl DocumentRepository {
    pub async fn create(conn: &Connection, doc: &Document) -> Result<()> {
        conn.execute(
            r#"
            INSERT INTO documents (
                id, user_id, title, url, content, source, checksum,
                tags, chunks, embedded, metadata, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                doc.id.clone(),
                doc.user_id.clone(),
                doc.title.clone(),
                doc.url.clone(),
                doc.content.clone(),
                doc.source.to_string(),
                doc.checksum.clone(),
                serde_json::to_string(&doc.tags)?,
                serde_json::to_string(&doc.chunks)?,
                doc.embedded as i32,
                serde_json::to_string(&doc.metadata)?,
                doc.created_at.to_rfc3339(),
            ],
        )
        .await?;

        Ok(())
    }

    pub async fn get_by_id(
        conn: &Connection,
        user_id: &str,
        id: &str,
    ) -> Result<Option<Document>> {
        let mut rows = conn
            .query(
                "SELECT * FROM documents WHERE user_id = ?1 AND id = ?2",
                params![user_id, id],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_document(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn get(conn: &Connection, id: &str) -> Result<Option<Document>> {
        let mut rows = conn
            .query("SELECT * FROM documents WHERE id = ?1", params![id])
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_document(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn get_by_ids(
        conn: &Connection,
        user_id: &str,
        ids: &[String],
    ) -> Result<Vec<Document>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut placeholders = String::new();
        for i in 0..ids.len() {
            if i > 0 {
                placeholders.push_str(", ");
            }
            placeholders.push('?');
            placeholders.push_str(&(i + 2).to_string());
        }

        let sql = format!("SELECT * FROM documents WHERE user_id = ?1 AND id IN ({placeholders})");
        let mut values: Vec<libsql::Value> = vec![libsql::Value::from(user_id.to_string())];
        values.extend(ids.iter().map(|id| libsql::Value::from(id.clone())));

        let mut rows = conn.query(&sql, libsql::params_from_iter(values)).await?;
        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(Self::row_to_document(&row)?);
        }
        Ok(results)
    }

    pub async fn find_by_checksum(
        conn: &Connection,
        user_id: &str,
        checksum: &str,
    ) -> Result<Option<Document>> {
        let mut rows = conn
            .query(
                "SELECT * FROM documents WHERE user_id = ?1 AND checksum = ?2",
                params![user_id, checksum],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_document(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn find_by_url(
        conn: &Connection,
        user_id: &str,
        url: &str,
    ) -> Result<Option<Document>> {
        let mut rows = conn
            .query(
                "SELECT * FROM documents WHERE user_id = ?1 AND url = ?2",
                params![user_id, url],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_document(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn list(
        conn: &Connection,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<DocumentSummary>> {
        let mut rows = conn
            .query(
                "SELECT * FROM documents WHERE user_id = ?1 ORDER BY created_at DESC LIMIT ?2",
                params![user_id, limit as i64],
            )
            .await?;

        let mut documents = Vec::new();
        while let Some(row) = rows.next().await? {
            documents.push(DocumentSummary::from(Self::row_to_document(&row)?));
        }
        Ok(documents)
    }

    pub async fn update_tags(conn: &Connection, id: &str, tags: &[String]) -> Result<()> {
        conn.execute(
            "UPDATE documents SET tags = ?2 WHERE id = ?1",
            params![id, serde_json::to_string(tags)?],
        )
        .await?;
        Ok(())
    }

    pub async fn update_embedding(
        conn: &Connection,
        id: &str,
        chunks: &[String],
        centroid: &[f32],
    ) -> Result<()> {
        conn.execute(
            "UPDATE documents SET chunks = ?2, centroid = vector32(?3), embedded = 1 WHERE id = ?1",
            params![
                id,
                serde_json::to_string(chunks)?,
                serde_json::to_string(centroid)?,
            ],
        )
        .await?;
        Ok(())
    }

    pub async fn get_pending(conn: &Connection, limit: u32) -> Result<Vec<PendingDocument>> {
        let mut rows = conn
            .query(
                r#"
                SELECT id, created_at
                FROM documents
                WHERE embedded = 0
                ORDER BY created_at ASC
                LIMIT ?1
                "#,
                params![limit as i64],
            )
            .await?;

        let mut docs = Vec::new();
        while let Some(row) = rows.next().await? {
            docs.push(PendingDocument {
                id: row.get(0)?,
                created_at: DateTime::parse_from_rfc3339(&row.get::<String>(1)?)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            });
        }
        Ok(docs)
    }

    pub async fn pattern_search(
        conn: &Connection,
        user_id: &str,
        pattern: &str,
        limit: u32,
    ) -> Result<Vec<Document>> {
        // LIKE is case-insensitive for ASCII in SQLite; the pattern itself
        // is bound, never interpolated.
        let like = format!("%{}%", pattern.replace('%', "\\%").replace('_', "\\_"));

        let mut rows = conn
            .query(
                r#"
                SELECT * FROM documents
                WHERE user_id = ?1 AND content LIKE ?2 ESCAPE '\'
                ORDER BY created_at DESC
                LIMIT ?3
                "#,
                params![user_id, like, limit as i64],
            )
            .await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(Self::row_to_document(&row)?);
        }
        Ok(results)
    }

    fn row_to_document(row: &libsql::Row) -> Result<Document> {
        let centroid = row
            .get::<Option<Vec<u8>>>(9)?
            .map(|blob| blob_to_vector(&blob));

        Ok(Document {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            url: row.get(3)?,
            content: row.get(4)?,
            source: row
                .get::<String>(5)?
                .parse()
                .unwrap_or(SourceKind::Note),
            checksum: row.get(6)?,
            tags: serde_json::from_str(&row.get::<String>(7)?).unwrap_or_default(),
            chunks: serde_json::from_str(&row.get::<String>(8)?).unwrap_or_default(),
            centroid,
            embedded: row.get::<i64>(10)? != 0,
            metadata: serde_json::from_str(&row.get::<String>(11)?).unwrap_or_default(),
            created_at: DateTime::parse_from_rfc3339(&row.get::<String>(12)?)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Metadata;

    async fn setup_test_db() -> Connection {
        let conn = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .unwrap()
            .connect()
            .unwrap();

        crate::db::schema::init_schema(&conn, 4).await.unwrap();
        conn
    }

    fn make_doc(id: &str, user_id: &str, checksum: &str, content: &str) -> Document {
        Document::new(
            id.to_string(),
            user_id.to_string(),
            format!("title {id}"),
            Some(format!("https://example.com/{id}")),
            content.to_string(),
            SourceKind::GoogleDocs,
            checksum.to_string(),
            Metadata::new(),
        )
    }

    #[tokio::test]
    async fn test_create_and_find_by_checksum() {
        let conn = setup_test_db().await;
        let doc = make_doc("d1", "u1", "sum1", "hello world");
        DocumentRepository::create(&conn, &doc).await.unwrap();

        let found = DocumentRepository::find_by_checksum(&conn, "u1", "sum1")
            .await
            .unwrap()
            .expect("document should be found");
        assert_eq!(found.id, "d1");
        assert_eq!(found.content, "hello world");
        assert_eq!(found.source, SourceKind::GoogleDocs);
        assert!(!found.embedded);
        assert!(found.centroid.is_none());

        let missing = DocumentRepository::find_by_checksum(&conn, "u2", "sum1")
            .await
            .unwrap();
        assert!(missing.is_none(), "checksum lookup must be user scoped");
    }

    #[tokio::test]
    async fn test_duplicate_checksum_rejected_by_constraint() {
        let conn = setup_test_db().await;
        DocumentRepository::create(&conn, &make_doc("d1", "u1", "same", "x"))
            .await
            .unwrap();

        let doc2 = Document {
            url: None,
            ..make_doc("d2", "u1", "same", "x")
        };
        let result = DocumentRepository::create(&conn, &doc2).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().is_constraint_violation());
    }

    #[tokio::test]
    async fn test_update_embedding_backfills_fields() {
        let conn = setup_test_db().await;
        DocumentRepository::create(&conn, &make_doc("d1", "u1", "c1", "some text"))
            .await
            .unwrap();

        let chunks = vec!["some".to_string(), "text".to_string()];
        let centroid = vec![0.1_f32, 0.2, 0.3, 0.4];
        DocumentRepository::update_embedding(&conn, "d1", &chunks, &centroid)
            .await
            .unwrap();

        let doc = DocumentRepository::get_by_id(&conn, "u1", "d1")
            .await
            .unwrap()
            .unwrap();
        assert!(doc.embedded);
        assert_eq!(doc.chunks, chunks);
        let stored = doc.centroid.expect("centroid should be set");
        assert_eq!(stored.len(), 4);
        for (a, b) in stored.iter().zip(centroid.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[tokio::test]
    async fn test_pending_excludes_embedded_documents() {
        let conn = setup_test_db().await;
        DocumentRepository::create(&conn, &make_doc("d1", "u1", "c1", "a"))
            .await
            .unwrap();
        DocumentRepository::create(&conn, &make_doc("d2", "u1", "c2", "b"))
            .await
            .unwrap();
        DocumentRepository::update_embedding(&conn, "d1", &["a".to_string()], &[0.0, 0.0, 0.0, 0.0])
            .await
            .unwrap();

        let pending = DocumentRepository::get_pending(&conn, 10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "d2");
    }

    #[tokio::test]
    async fn test_pattern_search_scoped_and_capped() {
        let conn = setup_test_db().await;
        for i in 0..7 {
            DocumentRepository::create(
                &conn,
                &make_doc(
                    &format!("d{i}"),
                    "u1",
                    &format!("c{i}"),
                    &format!("the roadmap for q{i}"),
                ),
            )
            .await
            .unwrap();
        }
        DocumentRepository::create(&conn, &make_doc("other", "u2", "cx", "roadmap too"))
            .await
            .unwrap();

        let hits = DocumentRepository::pattern_search(&conn, "u1", "roadmap", 5)
            .await
            .unwrap();
        assert_eq!(hits.len(), 5, "results must be capped");
        assert!(hits.iter().all(|d| d.user_id == "u1"));

        let none = DocumentRepository::pattern_search(&conn, "u1", "nonexistent", 5)
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_pattern_search_escapes_like_wildcards() {
        let conn = setup_test_db().await;
        DocumentRepository::create(&conn, &make_doc("d1", "u1", "c1", "plain text"))
            .await
            .unwrap();

        let hits = DocumentRepository::pattern_search(&conn, "u1", "%", 5)
            .await
            .unwrap();
        assert!(hits.is_empty(), "literal %% must not match everything");
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let conn = setup_test_db().await;
        let mut older = make_doc("d1", "u1", "c1", "a");
        older.created_at = "2026-01-01T00:00:00Z".parse().unwrap();
        let mut newer = make_doc("d2", "u1", "c2", "b");
        newer.created_at = "2026-02-01T00:00:00Z".parse().unwrap();
        DocumentRepository::create(&conn, &older).await.unwrap();
        DocumentRepository::create(&conn, &newer).await.unwrap();

        let list = DocumentRepository::list(&conn, "u1", 10).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, "d2");
    }
}
