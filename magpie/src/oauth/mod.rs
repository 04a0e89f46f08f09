use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;

use crate::config::SourcesConfig;
use crate::db::DatabaseBackend;
use crate::error::{MagpieError, Result};

const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Tokens are refreshed when within this many seconds of expiry, so a
/// token never goes stale mid-import.
pub const REFRESH_GRACE_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: i64,
}

/// Refresh-on-demand access to stored OAuth bundles.
#[derive(Clone)]
pub struct TokenService {
    db: Arc<dyn DatabaseBackend>,
    client: reqwest::Client,
    google_token_url: String,
}

impl TokenService {
    pub fn new(db: Arc<dyn DatabaseBackend>, config: &SourcesConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MagpieError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            db,
            client,
            google_token_url: config
                .google_token_url
                .clone()
                .unwrap_or_else(|| GOOGLE_TOKEN_URL.to_string()),
        })
    }

    /// Return a usable access token for the user's provider connection,
    /// refreshing and persisting it first if it is about to expire.
    pub async fn get_valid_access_token(&self, user_id: &str, provider: &str) -> Result<String> {
        let bundle = self
            .db
            .get_token_bundle(user_id, provider)
            .await?
            .ok_or_else(|| {
                MagpieError::Config(format!(
                    "No {provider} credentials stored for user {user_id}"
                ))
            })?;

        if !bundle.needs_refresh(Utc::now(), REFRESH_GRACE_SECS) {
            return Ok(bundle.access_token);
        }

        tracing::debug!(user_id, provider, "Access token near expiry, refreshing");

        let token_url = self.token_url(provider)?;
        let response = self
            .client
            .post(token_url)
            .form(&[
                ("client_id", bundle.client_id.as_str()),
                ("client_secret", bundle.client_secret.as_str()),
                ("refresh_token", bundle.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| MagpieError::Source(format!("Token refresh request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MagpieError::Auth(format!(
                "Token refresh rejected ({status}): {body}"
            )));
        }

        let refreshed: RefreshResponse = response
            .json()
            .await
            .map_err(|e| MagpieError::Source(format!("Invalid token refresh response: {e}")))?;

        let expiry = Utc::now() + chrono::Duration::seconds(refreshed.expires_in);
        self.db
            .update_access_token(user_id, provider, &refreshed.access_token, expiry)
            .await?;

        Ok(refreshed.access_token)
    }

    fn token_url(&self, provider: &str) -> Result<&str> {
        match provider {
            "google" | "gmail" => Ok(&self.google_token_url),
            other => Err(MagpieError::Config(format!(
                "Provider {other} has no refresh endpoint"
            ))),
        }
    }
}
