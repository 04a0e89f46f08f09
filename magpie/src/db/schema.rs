use libsql::Connection;

use crate::error::Result;

pub async fn init_schema(conn: &Connection, embedding_dimensions: usize) -> Result<()> {
    let ddl = format!(
        r#"
        -- Documents table
        CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            title TEXT NOT NULL,
            url TEXT,
            content TEXT NOT NULL,
            source TEXT NOT NULL DEFAULT 'note',
            checksum TEXT NOT NULL,
            tags TEXT DEFAULT '[]',
            chunks TEXT DEFAULT '[]',
            centroid F32_BLOB({dims}),
            embedded INTEGER NOT NULL DEFAULT 0,
            metadata TEXT DEFAULT '{{}}',
            created_at TEXT NOT NULL
        );

        -- Dedup invariant: at most one document per (user, content checksum).
        -- Concurrent inserts race to this index; the loser re-reads the winner.
        CREATE UNIQUE INDEX IF NOT EXISTS idx_documents_user_checksum
            ON documents(user_id, checksum);
        CREATE INDEX IF NOT EXISTS idx_documents_user_id ON documents(user_id);
        -- Url identity for url-keyed sources. NULL urls (uploads, notes)
        -- never collide: SQLite treats each NULL as distinct here.
        CREATE UNIQUE INDEX IF NOT EXISTS idx_documents_user_url
            ON documents(user_id, url);
        CREATE INDEX IF NOT EXISTS idx_documents_embedded ON documents(embedded);

        -- Sections table with vector embedding
        CREATE TABLE IF NOT EXISTS sections (
            id TEXT PRIMARY KEY,
            document_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            content TEXT NOT NULL,
            embedding F32_BLOB({dims}),
            created_at TEXT NOT NULL,
            FOREIGN KEY (document_id) REFERENCES documents(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_sections_document_id ON sections(document_id);
        CREATE INDEX IF NOT EXISTS idx_sections_user_id ON sections(user_id);

        -- Conversation sessions
        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            query TEXT NOT NULL,
            response TEXT NOT NULL,
            sources TEXT DEFAULT '[]',
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);

        -- OAuth token bundles, one row per (user, provider)
        CREATE TABLE IF NOT EXISTS oauth_tokens (
            user_id TEXT NOT NULL,
            provider TEXT NOT NULL,
            access_token TEXT NOT NULL,
            refresh_token TEXT NOT NULL,
            expiry TEXT NOT NULL,
            client_id TEXT NOT NULL,
            client_secret TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (user_id, provider)
        );
        "#,
        dims = embedding_dimensions
    );

    conn.execute_batch(&ddl).await?;

    create_vector_index(conn).await?;

    Ok(())
}

async fn create_vector_index(conn: &Connection) -> Result<()> {
    let index_exists: bool = conn
        .query(
            "SELECT 1 FROM sqlite_master WHERE type='index' AND name='sections_embedding_idx'",
            (),
        )
        .await?
        .next()
        .await?
        .is_some();

    if !index_exists {
        if let Err(e) = conn
            .execute(
                "CREATE INDEX IF NOT EXISTS sections_embedding_idx ON sections(libsql_vector_idx(embedding))",
                (),
            )
            .await
        {
            tracing::warn!("Vector index creation failed for sections (may already exist): {e}");
        }
    }

    Ok(())
}
