use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use gatelease_core::{AppError, AppResult, GrantId, NonEmptyString};
use gatelease_domain::{
    AccessEvent, AccessEventKind, AccessGrant, GrantStatus, SourceAddress, TerminalStatus,
};

use crate::lifecycle_config::LifecycleConfig;
use crate::lifecycle_ports::{
    AccessNotifier, GrantRequest, GrantStore, PerimeterGateway, RemoveOutcome, StatusTransition,
};

#[cfg(test)]
pub(crate) mod tests;

/// Result of a revoke or expire call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokeOutcome {
    /// This caller removed the rule and wrote the terminal status.
    Completed,
    /// The grant was already terminal, or a concurrent caller won the
    /// transition; nothing was changed and nothing is wrong.
    AlreadyTerminal,
}

/// The access lifecycle state machine.
///
/// Creates grants, applies and removes perimeter rules, and drives every
/// grant through exactly one terminal transition. Racing callers converge
/// through the store's compare-and-set and the gateway's idempotent remove;
/// the engine itself holds no mutable state.
#[derive(Clone)]
pub struct AccessLifecycleService {
    store: Arc<dyn GrantStore>,
    gateway: Arc<dyn PerimeterGateway>,
    notifier: Arc<dyn AccessNotifier>,
    config: LifecycleConfig,
}

impl AccessLifecycleService {
    /// Creates a new service from required collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn GrantStore>,
        gateway: Arc<dyn PerimeterGateway>,
        notifier: Arc<dyn AccessNotifier>,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            notifier,
            config,
        }
    }

    /// Grants temporary access: validates the request, applies the perimeter
    /// rule, then persists the active record.
    ///
    /// The rule is applied before the record is written, so a gateway failure
    /// leaves no trace. A store failure after the rule applied leaves an
    /// orphan rule for the external reconciliation pass; the error is
    /// surfaced either way and the operation is never retried internally.
    pub async fn grant(&self, request: GrantRequest) -> AppResult<AccessGrant> {
        let requester = NonEmptyString::new(request.requester)
            .map_err(|_| AppError::Validation("requester must not be empty".to_owned()))?;

        let source_address = SourceAddress::parse(&request.source_address)?;

        if !self.config.allowed_ports().permits(request.port) {
            return Err(AppError::Validation(format!(
                "port {} is not in the configured allow-list",
                request.port
            )));
        }

        let grant_id = GrantId::new();
        let perimeter_ref = self
            .gateway
            .apply_rule(source_address, request.port, grant_id)
            .await?;

        let granted_at = Utc::now();
        let grant = AccessGrant::new(
            grant_id,
            requester,
            source_address,
            request.port,
            request.reason,
            perimeter_ref,
            granted_at,
            self.config.grant_duration_minutes(),
        );

        if let Err(error) = self.store.put(grant.clone()).await {
            warn!(
                grant_id = %grant.id,
                perimeter_ref = %grant.perimeter_ref,
                error = %error,
                "rule applied but grant record could not be persisted; rule is orphaned until reconciliation"
            );
            return Err(error);
        }

        info!(
            grant_id = %grant.id,
            requester = grant.requester.as_str(),
            source_address = %grant.source_address,
            port = grant.port,
            expires_at = %grant.expires_at,
            "access granted"
        );

        self.notify_best_effort(AccessEvent::for_grant(
            AccessEventKind::Granted,
            &grant,
            granted_at,
        ))
        .await;

        Ok(grant)
    }

    /// Revokes a grant on explicit caller request, writing `REVOKED`.
    ///
    /// Idempotent: revoking an already-terminal grant succeeds without a
    /// second gateway removal.
    pub async fn revoke(&self, grant_id: GrantId) -> AppResult<RevokeOutcome> {
        self.terminate(grant_id, TerminalStatus::Revoked).await
    }

    /// Expires a grant on behalf of the sweeper, writing `EXPIRED`.
    pub async fn expire(&self, grant_id: GrantId) -> AppResult<RevokeOutcome> {
        self.terminate(grant_id, TerminalStatus::Expired).await
    }

    /// Returns the grant with the given id.
    pub async fn get(&self, grant_id: GrantId) -> AppResult<AccessGrant> {
        self.store
            .find(grant_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("grant '{grant_id}' does not exist")))
    }

    /// Returns all grant records, terminal ones included.
    pub async fn list(&self) -> AppResult<Vec<AccessGrant>> {
        self.store.list().await
    }

    async fn terminate(
        &self,
        grant_id: GrantId,
        terminal: TerminalStatus,
    ) -> AppResult<RevokeOutcome> {
        let grant = self
            .store
            .find(grant_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("grant '{grant_id}' does not exist")))?;

        if grant.status.is_terminal() {
            return Ok(RevokeOutcome::AlreadyTerminal);
        }

        // Removed and AlreadyAbsent both establish "rule absent"; any other
        // gateway failure keeps the grant active and retryable.
        let outcome = self.gateway.remove_rule(grant.perimeter_ref.as_str()).await?;
        if outcome == RemoveOutcome::AlreadyAbsent {
            debug!(
                grant_id = %grant_id,
                perimeter_ref = %grant.perimeter_ref,
                "perimeter rule was already absent"
            );
        }

        let revoked_at = Utc::now();
        match self
            .store
            .update_status(
                grant_id,
                GrantStatus::Active,
                terminal.as_status(),
                revoked_at,
            )
            .await?
        {
            StatusTransition::Applied => {
                info!(
                    grant_id = %grant_id,
                    status = %terminal.as_status(),
                    "access terminated"
                );

                self.notify_best_effort(AccessEvent::for_grant(terminal.into(), &grant, revoked_at))
                    .await;

                Ok(RevokeOutcome::Completed)
            }
            StatusTransition::Conflict => Ok(RevokeOutcome::AlreadyTerminal),
        }
    }

    async fn notify_best_effort(&self, event: AccessEvent) {
        if let Err(error) = self.notifier.notify(event).await {
            warn!(error = %error, "failed to deliver access event notification");
        }
    }
}
