use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use gatelease_application::{GrantStore, StatusTransition};
use gatelease_core::{AppError, AppResult, GrantId};
use gatelease_domain::{AccessGrant, GrantStatus};

/// In-memory grant store implementation.
///
/// Reference store for development and tests; the compare-and-set runs under
/// the write lock, giving the same single-record atomicity the durable store
/// provides.
#[derive(Debug, Default)]
pub struct InMemoryGrantStore {
    grants: RwLock<HashMap<GrantId, AccessGrant>>,
}

impl InMemoryGrantStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            grants: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl GrantStore for InMemoryGrantStore {
    async fn put(&self, grant: AccessGrant) -> AppResult<()> {
        let mut grants = self.grants.write().await;

        if grants.contains_key(&grant.id) {
            return Err(AppError::Conflict(format!(
                "grant '{}' already exists",
                grant.id
            )));
        }

        grants.insert(grant.id, grant);
        Ok(())
    }

    async fn find(&self, grant_id: GrantId) -> AppResult<Option<AccessGrant>> {
        Ok(self.grants.read().await.get(&grant_id).cloned())
    }

    async fn update_status(
        &self,
        grant_id: GrantId,
        expected: GrantStatus,
        new_status: GrantStatus,
        revoked_at: DateTime<Utc>,
    ) -> AppResult<StatusTransition> {
        let mut grants = self.grants.write().await;

        let Some(grant) = grants.get_mut(&grant_id) else {
            return Ok(StatusTransition::Conflict);
        };

        if grant.status != expected {
            return Ok(StatusTransition::Conflict);
        }

        grant.status = new_status;
        grant.revoked_at = Some(revoked_at);
        Ok(StatusTransition::Applied)
    }

    async fn list_expired_active(&self, now: DateTime<Utc>) -> AppResult<Vec<AccessGrant>> {
        let grants = self.grants.read().await;

        let mut due: Vec<AccessGrant> = grants
            .values()
            .filter(|grant| grant.status == GrantStatus::Active && grant.is_expired_at(now))
            .cloned()
            .collect();
        due.sort_by_key(|grant| grant.expires_at);

        Ok(due)
    }

    async fn list(&self) -> AppResult<Vec<AccessGrant>> {
        let grants = self.grants.read().await;

        let mut values: Vec<AccessGrant> = grants.values().cloned().collect();
        values.sort_by_key(|grant| grant.granted_at);

        Ok(values)
    }
}
