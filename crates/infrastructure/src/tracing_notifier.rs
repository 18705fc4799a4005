//! Console notifier for development. Logs lifecycle events to tracing output.

use async_trait::async_trait;
use tracing::info;

use gatelease_application::AccessNotifier;
use gatelease_core::AppResult;
use gatelease_domain::AccessEvent;

/// Development notifier that logs lifecycle events to the console.
#[derive(Clone)]
pub struct TracingNotifier;

impl TracingNotifier {
    /// Creates a new tracing notifier.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for TracingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccessNotifier for TracingNotifier {
    async fn notify(&self, event: AccessEvent) -> AppResult<()> {
        info!(
            kind = event.kind.as_str(),
            grant_id = %event.grant_id,
            requester = event.requester.as_str(),
            source_address = %event.source_address,
            port = event.port,
            timestamp = %event.timestamp,
            "access lifecycle event"
        );

        Ok(())
    }
}
