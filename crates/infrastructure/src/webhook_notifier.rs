use async_trait::async_trait;

use gatelease_application::AccessNotifier;
use gatelease_core::{AppError, AppResult};
use gatelease_domain::AccessEvent;

/// Notifier that POSTs lifecycle events to a configured webhook.
///
/// Delivery is best-effort by contract: the engine logs and swallows any
/// error this adapter returns.
pub struct WebhookNotifier {
    http_client: reqwest::Client,
    webhook_url: String,
}

impl WebhookNotifier {
    /// Creates a notifier targeting the given webhook URL.
    #[must_use]
    pub fn new(http_client: reqwest::Client, webhook_url: String) -> Self {
        Self {
            http_client,
            webhook_url,
        }
    }
}

#[async_trait]
impl AccessNotifier for WebhookNotifier {
    async fn notify(&self, event: AccessEvent) -> AppResult<()> {
        let response = self
            .http_client
            .post(self.webhook_url.as_str())
            .json(&event)
            .send()
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to call notification webhook: {error}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Internal(format!(
                "notification webhook returned status {}",
                status.as_u16()
            )));
        }

        Ok(())
    }
}
