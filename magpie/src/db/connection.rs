use libsql::{Builder, Connection};
use std::sync::Arc;

use crate::config::DatabaseConfig;
use crate::error::Result;

use super::schema;

pub struct Database {
    pub(crate) db: Arc<libsql::Database>,
    pub(crate) busy_timeout_ms: u64,
    /// For `:memory:` databases each libsql connection is a separate empty
    /// database, so the connection opened at init is shared instead.
    pub(crate) memory_conn: Option<Connection>,
}

impl Database {
    pub async fn new(config: &DatabaseConfig, embedding_dimensions: usize) -> Result<Self> {
        let busy_timeout_ms = std::env::var("DATABASE_BUSY_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(5000);

        let db = if config.url.starts_with("libsql://") || config.url.starts_with("https://") {
            if let Some(ref local_path) = config.local_path {
                Builder::new_remote_replica(
                    local_path,
                    config.url.clone(),
                    config.auth_token.clone().unwrap_or_default(),
                )
                .build()
                .await?
            } else {
                Builder::new_remote(
                    config.url.clone(),
                    config.auth_token.clone().unwrap_or_default(),
                )
                .build()
                .await?
            }
        } else if config.url == ":memory:" {
            Builder::new_local(":memory:").build().await?
        } else {
            let path = config.url.strip_prefix("file:").unwrap_or(&config.url);
            Builder::new_local(path).build().await?
        };

        let is_memory = config.url == ":memory:"
            || config.url.strip_prefix("file:") == Some(":memory:");
        let memory_conn = if is_memory {
            Some(db.connect()?)
        } else {
            None
        };

        let database = Self {
            db: Arc::new(db),
            busy_timeout_ms,
            memory_conn,
        };
        database.configure_database().await?;
        database.init_schema(embedding_dimensions).await?;

        Ok(database)
    }

    pub fn connect(&self) -> Result<Connection> {
        if let Some(ref conn) = self.memory_conn {
            return Ok(conn.clone());
        }
        Ok(self.db.connect()?)
    }

    async fn configure_database(&self) -> Result<()> {
        let conn = self.connect()?;

        let busy_timeout_sql = format!("PRAGMA busy_timeout = {}", self.busy_timeout_ms);
        if let Err(error) = conn.execute_batch(&busy_timeout_sql).await {
            tracing::warn!(
                busy_timeout_ms = self.busy_timeout_ms,
                error = %error,
                "Failed to set SQLite busy_timeout"
            );
        }

        if let Err(error) = conn.execute_batch("PRAGMA journal_mode = WAL").await {
            tracing::warn!(error = %error, "Failed to set SQLite journal_mode");
        }

        if let Err(error) = conn.execute_batch("PRAGMA synchronous = NORMAL").await {
            tracing::warn!(error = %error, "Failed to set SQLite synchronous pragma");
        }

        Ok(())
    }

    async fn init_schema(&self, embedding_dimensions: usize) -> Result<()> {
        let conn = self.connect()?;
        schema::init_schema(&conn, embedding_dimensions).await?;
        Ok(())
    }

    pub async fn sync(&self) -> Result<()> {
        if let Ok(sync) = self.db.sync().await {
            tracing::debug!("Database synced: {:?}", sync);
        }
        Ok(())
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            busy_timeout_ms: self.busy_timeout_ms,
            memory_conn: self.memory_conn.clone(),
        }
    }
}
