use std::time::Duration;

use serde::Deserialize;

use crate::config::SourcesConfig;
use crate::error::{MagpieError, Result};

const GMAIL_BASE_URL: &str = "https://gmail.googleapis.com";

#[derive(Debug, Deserialize)]
struct GmailProfile {
    #[serde(rename = "emailAddress")]
    email_address: String,
}

/// Gmail credential probe. Confirms a stored token can reach the
/// mailbox; no mail is fetched.
pub struct GmailSource {
    client: reqwest::Client,
    base_url: String,
}

impl GmailSource {
    pub fn new(config: &SourcesConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MagpieError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config
                .gmail_base_url
                .clone()
                .unwrap_or_else(|| GMAIL_BASE_URL.to_string()),
        })
    }

    /// Validate a token against the profile endpoint, returning the
    /// mailbox address on success.
    pub async fn validate(&self, access_token: &str) -> Result<String> {
        let url = format!("{}/gmail/v1/users/me/profile", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| MagpieError::Source(format!("Gmail profile request failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            return Err(MagpieError::Auth(format!(
                "Gmail rejected credentials ({status}): {body}"
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MagpieError::Source(format!(
                "Gmail profile request failed ({status}): {body}"
            )));
        }

        let profile: GmailProfile = response
            .json()
            .await
            .map_err(|e| MagpieError::Source(format!("Invalid Gmail profile response: {e}")))?;
        Ok(profile.email_address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base: &str) -> SourcesConfig {
        SourcesConfig {
            google_page_size: 5,
            google_base_url: None,
            google_token_url: None,
            notion_base_url: None,
            notion_version: "2022-06-28".to_string(),
            gmail_base_url: Some(base.to_string()),
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn test_valid_token_returns_email() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/profile"))
            .and(header("authorization", "Bearer at-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "emailAddress": "person@example.com",
                "messagesTotal": 42
            })))
            .mount(&server)
            .await;

        let source = GmailSource::new(&config(&server.uri())).unwrap();
        let email = source.validate("at-1").await.unwrap();
        assert_eq!(email, "person@example.com");
    }

    #[tokio::test]
    async fn test_rejected_token_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/profile"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let source = GmailSource::new(&config(&server.uri())).unwrap();
        assert!(matches!(
            source.validate("bad").await.unwrap_err(),
            MagpieError::Auth(_)
        ));
    }
}
