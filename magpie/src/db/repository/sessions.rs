use chrono::{DateTime, Utc};
use libsql::{params, Connection};

use crate::error::Result;
use crate::models::Session;

pub struct SessionRepository;

impl SessionRepository {
    pub async fn create(conn: &Connection, session: &Session) -> Result<()> {
        conn.execute(
            r#"
            INSERT INTO sessions (id, user_id, query, response, sources, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                session.id.clone(),
                session.user_id.clone(),
                session.query.clone(),
                session.response.clone(),
                serde_json::to_string(&session.sources)?,
                session.created_at.to_rfc3339(),
            ],
        )
        .await?;
        Ok(())
    }

    pub async fn list(conn: &Connection, user_id: &str, limit: u32) -> Result<Vec<Session>> {
        let mut rows = conn
            .query(
                r#"
                SELECT id, user_id, query, response, sources, created_at
                FROM sessions
                WHERE user_id = ?1
                ORDER BY created_at DESC
                LIMIT ?2
                "#,
                params![user_id, limit as i64],
            )
            .await?;

        let mut sessions = Vec::new();
        while let Some(row) = rows.next().await? {
            sessions.push(Session {
                id: row.get(0)?,
                user_id: row.get(1)?,
                query: row.get(2)?,
                response: row.get(3)?,
                sources: serde_json::from_str(&row.get::<String>(4)?).unwrap_or_default(),
                created_at: DateTime::parse_from_rfc3339(&row.get::<String>(5)?)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            });
        }
        Ok(sessions)
    }
}
