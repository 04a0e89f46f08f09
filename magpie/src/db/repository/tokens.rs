use chrono::{DateTime, Utc};
use libsql::{params, Connection};

use crate::error::Result;
use crate::models::TokenBundle;

pub struct TokenRepository;

impl TokenRepository {
    pub async fn get(
        conn: &Connection,
        user_id: &str,
        provider: &str,
    ) -> Result<Option<TokenBundle>> {
        let mut rows = conn
            .query(
                r#"
                SELECT user_id, provider, access_token, refresh_token, expiry,
                       client_id, client_secret, updated_at
                FROM oauth_tokens
                WHERE user_id = ?1 AND provider = ?2
                "#,
                params![user_id, provider],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_bundle(&row)?))
        } else {
            Ok(None)
        }
    }

    /// Persist a fresh access token and expiry after a successful refresh.
    pub async fn update_access_token(
        conn: &Connection,
        user_id: &str,
        provider: &str,
        access_token: &str,
        expiry: DateTime<Utc>,
    ) -> Result<()> {
        conn.execute(
            r#"
            UPDATE oauth_tokens
            SET access_token = ?3, expiry = ?4, updated_at = ?5
            WHERE user_id = ?1 AND provider = ?2
            "#,
            params![
                user_id,
                provider,
                access_token,
                expiry.to_rfc3339(),
                Utc::now().to_rfc3339(),
            ],
        )
        .await?;
        Ok(())
    }

    pub async fn upsert(conn: &Connection, bundle: &TokenBundle) -> Result<()> {
        conn.execute(
            r#"
            INSERT INTO oauth_tokens (
                user_id, provider, access_token, refresh_token, expiry,
                client_id, client_secret, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT (user_id, provider) DO UPDATE SET
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token,
                expiry = excluded.expiry,
                client_id = excluded.client_id,
                client_secret = excluded.client_secret,
                updated_at = excluded.updated_at
            "#,
            params![
                bundle.user_id.clone(),
                bundle.provider.clone(),
                bundle.access_token.clone(),
                bundle.refresh_token.clone(),
                bundle.expiry.to_rfc3339(),
                bundle.client_id.clone(),
                bundle.client_secret.clone(),
                Utc::now().to_rfc3339(),
            ],
        )
        .await?;
        Ok(())
    }

    fn row_to_bundle(row: &libsql::Row) -> Result<TokenBundle> {
        Ok(TokenBundle {
            user_id: row.get(0)?,
            provider: row.get(1)?,
            access_token: row.get(2)?,
            refresh_token: row.get(3)?,
            expiry: DateTime::parse_from_rfc3339(&row.get::<String>(4)?)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            client_id: row.get(5)?,
            client_secret: row.get(6)?,
            updated_at: DateTime::parse_from_rfc3339(&row.get::<String>(7)?)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}
