use async_trait::async_trait;
use chrono::{DateTime, Utc};

use gatelease_core::{AppResult, GrantId};
use gatelease_domain::{AccessEvent, AccessGrant, GrantStatus, SourceAddress};

/// Inbound payload for a grant request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantRequest {
    /// Identity requesting access.
    pub requester: String,
    /// Source IP the rule should be scoped to, in textual form.
    pub source_address: String,
    /// Port the rule should open.
    pub port: u16,
    /// Free-text justification.
    pub reason: String,
}

/// Result of a compare-and-set status update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTransition {
    /// The record matched the expected status and was updated.
    Applied,
    /// The record no longer carries the expected status; a concurrent
    /// caller won the transition.
    Conflict,
}

/// Result of a perimeter rule removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// The rule existed and was removed.
    Removed,
    /// The rule was already gone, which equally establishes "rule absent".
    AlreadyAbsent,
}

/// Durable record store for access grants, the single source of truth for
/// reconciliation.
///
/// All mutation after insert goes through the single-record compare-and-set;
/// correctness under racing revokes rests on it, not on in-process locking.
#[async_trait]
pub trait GrantStore: Send + Sync {
    /// Inserts a new grant record. Fails with a conflict on a duplicate id.
    async fn put(&self, grant: AccessGrant) -> AppResult<()>;

    /// Returns the grant with the given id, when present.
    async fn find(&self, grant_id: GrantId) -> AppResult<Option<AccessGrant>>;

    /// Compare-and-set transition of a grant's status.
    ///
    /// Applies the new status and `revoked_at` only while the record still
    /// carries `expected`; otherwise reports a conflict without writing.
    async fn update_status(
        &self,
        grant_id: GrantId,
        expected: GrantStatus,
        new_status: GrantStatus,
        revoked_at: DateTime<Utc>,
    ) -> AppResult<StatusTransition>;

    /// Returns all active grants whose expiry instant is at or before `now`.
    async fn list_expired_active(&self, now: DateTime<Utc>) -> AppResult<Vec<AccessGrant>>;

    /// Returns all grant records, terminal ones included, for audit reads.
    async fn list(&self) -> AppResult<Vec<AccessGrant>>;
}

/// Interface to the external perimeter rule system.
///
/// Any concrete implementation must make removal idempotent: removing a rule
/// that is already gone reports [`RemoveOutcome::AlreadyAbsent`] rather than
/// an error. The core never retries `apply_rule` automatically.
#[async_trait]
pub trait PerimeterGateway: Send + Sync {
    /// Creates a scoped allow-rule and returns its gateway-side reference.
    async fn apply_rule(
        &self,
        source_address: SourceAddress,
        port: u16,
        grant_id: GrantId,
    ) -> AppResult<String>;

    /// Removes the rule identified by the given reference.
    async fn remove_rule(&self, perimeter_ref: &str) -> AppResult<RemoveOutcome>;
}

/// Best-effort delivery of human-readable lifecycle events.
///
/// Failures here are logged and swallowed by the engine; they never block
/// lifecycle correctness.
#[async_trait]
pub trait AccessNotifier: Send + Sync {
    /// Delivers one lifecycle event.
    async fn notify(&self, event: AccessEvent) -> AppResult<()>;
}
