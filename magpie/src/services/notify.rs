use std::time::Duration;

use serde::Serialize;

use crate::config::NotifyConfig;
use crate::error::{ErrorKind, MagpieError, Result};
use crate::models::ImportStatus;

/// One line of an import report, as posted to the webhook and returned in
/// the import response. `error_type`/`reason` are present only for failed
/// items so callers can render a specific remediation (e.g. "reconnect
/// Google" for `auth`).
#[derive(Debug, Clone, Serialize)]
pub struct ImportReportItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub status: ImportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ImportReportItem {
    pub fn ok(id: Option<String>, title: String, status: ImportStatus) -> Self {
        Self {
            id,
            title,
            status,
            error_type: None,
            reason: None,
        }
    }

    pub fn failed(title: String, error_type: ErrorKind, reason: String) -> Self {
        Self {
            id: None,
            title,
            status: ImportStatus::Error,
            error_type: Some(error_type),
            reason: Some(reason),
        }
    }
}

#[derive(Debug, Serialize)]
struct ImportReport<'a> {
    user_id: &'a str,
    source: &'a str,
    items: &'a [ImportReportItem],
}

/// Best-effort webhook notifier. Delivery is fire-and-forget; a failed
/// post is logged and forgotten.
#[derive(Clone)]
pub struct NotifyService {
    client: reqwest::Client,
    webhook_url: String,
}

impl NotifyService {
    pub fn new(config: &NotifyConfig) -> Result<Self> {
        // Reject a malformed webhook url at startup instead of on every
        // silently dropped post.
        let webhook_url = url::Url::parse(&config.webhook_url)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MagpieError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            webhook_url: webhook_url.into(),
        })
    }

    /// Spawn a detached post of the import report. Returns immediately.
    pub fn notify_import(&self, user_id: String, source: String, items: Vec<ImportReportItem>) {
        let service = self.clone();
        tokio::spawn(async move {
            if let Err(error) = service.post_report(&user_id, &source, &items).await {
                tracing::warn!(error = %error, user_id, "Import notification failed");
            }
        });
    }

    async fn post_report(
        &self,
        user_id: &str,
        source: &str,
        items: &[ImportReportItem],
    ) -> Result<()> {
        let report = ImportReport {
            user_id,
            source,
            items,
        };

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&report)
            .send()
            .await
            .map_err(|e| MagpieError::Source(format!("Webhook post failed: {e}")))?;

        if !response.status().is_success() {
            return Err(MagpieError::Source(format!(
                "Webhook returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}
