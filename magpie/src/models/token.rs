use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OAuth credentials for one `(user, provider)` pair. Owned by the
/// excluded auth subsystem; this core only refreshes access tokens on
/// demand and writes the refreshed bundle back atomically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenBundle {
    pub user_id: String,
    pub provider: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expiry: DateTime<Utc>,
    pub client_id: String,
    pub client_secret: String,
    pub updated_at: DateTime<Utc>,
}

impl TokenBundle {
    /// True when the access token expires within `grace_secs` and must be
    /// refreshed before use.
    pub fn needs_refresh(&self, now: DateTime<Utc>, grace_secs: i64) -> bool {
        self.expiry - now < chrono::Duration::seconds(grace_secs)
    }
}
