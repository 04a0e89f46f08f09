use chrono::{DateTime, Utc};
use libsql::{params, Connection};

use crate::error::Result;
use crate::models::{Section, SectionMatch};

pub struct SectionRepository;

impl SectionRepository {
    pub async fn create_batch(conn: &Connection, sections: &[Section]) -> Result<()> {
        for section in sections {
            conn.execute(
                r#"
                INSERT INTO sections (id, document_id, user_id, position, content, embedding, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, vector32(?6), ?7)
                "#,
                params![
                    section.id.clone(),
                    section.document_id.clone(),
                    section.user_id.clone(),
                    section.position as i64,
                    section.content.clone(),
                    serde_json::to_string(&section.embedding)?,
                    section.created_at.to_rfc3339(),
                ],
            )
            .await?;
        }
        Ok(())
    }

    pub async fn delete_by_document_id(conn: &Connection, document_id: &str) -> Result<u64> {
        let deleted = conn
            .execute(
                "DELETE FROM sections WHERE document_id = ?1",
                params![document_id],
            )
            .await?;
        Ok(deleted)
    }

    /// Cosine-similarity match over the user's sections. Only rows at or
    /// above `threshold` are returned, best first, at most `limit`.
    pub async fn match_sections(
        conn: &Connection,
        user_id: &str,
        embedding: &[f32],
        threshold: f32,
        limit: u32,
    ) -> Result<Vec<SectionMatch>> {
        let query_vector = serde_json::to_string(embedding)?;

        let mut rows = conn
            .query(
                r#"
                SELECT id, document_id, content,
                       1.0 - vector_distance_cos(embedding, vector32(?2)) AS score
                FROM sections
                WHERE user_id = ?1
                  AND embedding IS NOT NULL
                  AND 1.0 - vector_distance_cos(embedding, vector32(?2)) >= ?3
                ORDER BY score DESC
                LIMIT ?4
                "#,
                params![user_id, query_vector, threshold as f64, limit as i64],
            )
            .await?;

        let mut matches = Vec::new();
        while let Some(row) = rows.next().await? {
            matches.push(SectionMatch {
                section_id: row.get(0)?,
                document_id: row.get(1)?,
                content: row.get(2)?,
                similarity: Some(row.get::<f64>(3)? as f32),
            });
        }
        Ok(matches)
    }

    pub async fn pattern_search(
        conn: &Connection,
        user_id: &str,
        pattern: &str,
        limit: u32,
    ) -> Result<Vec<SectionMatch>> {
        let like = format!("%{}%", pattern.replace('%', "\\%").replace('_', "\\_"));

        let mut rows = conn
            .query(
                r#"
                SELECT id, document_id, content
                FROM sections
                WHERE user_id = ?1 AND content LIKE ?2 ESCAPE '\'
                ORDER BY created_at DESC
                LIMIT ?3
                "#,
                params![user_id, like, limit as i64],
            )
            .await?;

        let mut matches = Vec::new();
        while let Some(row) = rows.next().await? {
            matches.push(SectionMatch {
                section_id: row.get(0)?,
                document_id: row.get(1)?,
                content: row.get(2)?,
                similarity: None,
            });
        }
        Ok(matches)
    }

    #[cfg(test)]
    pub async fn get_by_document_id(conn: &Connection, document_id: &str) -> Result<Vec<Section>> {
        let mut rows = conn
            .query(
                r#"
                SELECT id, document_id, user_id, position, content, embedding, created_at
                FROM sections
                WHERE document_id = ?1
                ORDER BY position ASC
                "#,
                params![document_id],
            )
            .await?;

        let mut sections = Vec::new();
        while let Some(row) = rows.next().await? {
            let embedding = row
                .get::<Option<Vec<u8>>>(5)?
                .map(|blob| super::documents::blob_to_vector(&blob))
                .unwrap_or_default();
            sections.push(Section {
                id: row.get(0)?,
                document_id: row.get(1)?,
                user_id: row.get(2)?,
                position: row.get::<i64>(3)? as u32,
                content: row.get(4)?,
                embedding,
                created_at: DateTime::parse_from_rfc3339(&row.get::<String>(6)?)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            });
        }
        Ok(sections)
    }
}
