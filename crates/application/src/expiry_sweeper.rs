use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use gatelease_core::AppResult;

use crate::lifecycle_ports::GrantStore;
use crate::lifecycle_service::AccessLifecycleService;

/// Aggregate result of one sweep run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepReport {
    /// Grants driven to a terminal state during this run.
    pub expired_count: u32,
    /// Grants whose expiry failed and remain active for the next run.
    pub failed_count: u32,
}

/// Recurring process that expires grants past their deadline.
///
/// Each run queries the store for overdue active grants and drives each
/// through the engine's expire path independently; one grant's failure never
/// stops the rest of the batch. Overlapping runs and concurrent manual
/// revokes converge through the engine's idempotent terminate contract.
#[derive(Clone)]
pub struct ExpirySweeper {
    lifecycle: AccessLifecycleService,
    store: Arc<dyn GrantStore>,
}

impl ExpirySweeper {
    /// Creates a sweeper over the given engine and store.
    #[must_use]
    pub fn new(lifecycle: AccessLifecycleService, store: Arc<dyn GrantStore>) -> Self {
        Self { lifecycle, store }
    }

    /// Runs one sweep against the current wall clock.
    pub async fn sweep_once(&self) -> AppResult<SweepReport> {
        self.sweep_once_at(Utc::now()).await
    }

    /// Runs one sweep treating `now` as the expiry deadline.
    pub async fn sweep_once_at(&self, now: DateTime<Utc>) -> AppResult<SweepReport> {
        let due = self.store.list_expired_active(now).await?;
        let mut report = SweepReport::default();

        for grant in due {
            match self.lifecycle.expire(grant.id).await {
                Ok(_) => {
                    report.expired_count += 1;
                }
                Err(error) => {
                    warn!(
                        grant_id = %grant.id,
                        requester = grant.requester.as_str(),
                        error = %error,
                        "failed to expire overdue grant; it stays active for the next sweep"
                    );
                    report.failed_count += 1;
                }
            }
        }

        if report.expired_count > 0 || report.failed_count > 0 {
            info!(
                expired_count = report.expired_count,
                failed_count = report.failed_count,
                "expiry sweep complete"
            );
        }

        Ok(report)
    }
}
