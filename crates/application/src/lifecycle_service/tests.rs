use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use gatelease_core::{AppError, AppResult, GrantId};
use gatelease_domain::{AccessEvent, AccessEventKind, AccessGrant, GrantStatus, PortAllowList, SourceAddress};

use crate::lifecycle_config::LifecycleConfig;
use crate::lifecycle_ports::{
    AccessNotifier, GrantRequest, GrantStore, PerimeterGateway, RemoveOutcome, StatusTransition,
};

use super::{AccessLifecycleService, RevokeOutcome};

#[derive(Default)]
pub(crate) struct FakeGrantStore {
    grants: Mutex<HashMap<GrantId, AccessGrant>>,
}

#[async_trait]
impl GrantStore for FakeGrantStore {
    async fn put(&self, grant: AccessGrant) -> AppResult<()> {
        let mut grants = self.grants.lock().await;
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
        Ok(self.grants.lock().await.get(&grant_id).cloned())
    }

    async fn update_status(
        &self,
        grant_id: GrantId,
        expected: GrantStatus,
        new_status: GrantStatus,
        revoked_at: DateTime<Utc>,
    ) -> AppResult<StatusTransition> {
        let mut grants = self.grants.lock().await;
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
        Ok(self
            .grants
            .lock()
            .await
            .values()
            .filter(|grant| grant.status == GrantStatus::Active && grant.is_expired_at(now))
            .cloned()
            .collect())
    }

    async fn list(&self) -> AppResult<Vec<AccessGrant>> {
        Ok(self.grants.lock().await.values().cloned().collect())
    }
}

/// Store wrapper that loses every compare-and-set race.
struct AlwaysConflictingStore {
    inner: Arc<FakeGrantStore>,
}

#[async_trait]
impl GrantStore for AlwaysConflictingStore {
    async fn put(&self, grant: AccessGrant) -> AppResult<()> {
        self.inner.put(grant).await
    }

    async fn find(&self, grant_id: GrantId) -> AppResult<Option<AccessGrant>> {
        self.inner.find(grant_id).await
    }

    async fn update_status(
        &self,
        _grant_id: GrantId,
        _expected: GrantStatus,
        _new_status: GrantStatus,
        _revoked_at: DateTime<Utc>,
    ) -> AppResult<StatusTransition> {
        Ok(StatusTransition::Conflict)
    }

    async fn list_expired_active(&self, now: DateTime<Utc>) -> AppResult<Vec<AccessGrant>> {
        self.inner.list_expired_active(now).await
    }

    async fn list(&self) -> AppResult<Vec<AccessGrant>> {
        self.inner.list().await
    }
}

#[derive(Default)]
pub(crate) struct FakePerimeterGateway {
    rules: Mutex<HashMap<String, (SourceAddress, u16)>>,
    removed_count: AtomicU32,
    fail_apply: AtomicBool,
    fail_remove: AtomicBool,
}

impl FakePerimeterGateway {
    pub(crate) fn fail_apply(&self, fail: bool) {
        self.fail_apply.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_remove(&self, fail: bool) {
        self.fail_remove.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn removed_count(&self) -> u32 {
        self.removed_count.load(Ordering::SeqCst)
    }

    pub(crate) async fn rule_count(&self) -> usize {
        self.rules.lock().await.len()
    }

    pub(crate) async fn has_rule(&self, source_address: SourceAddress, port: u16) -> bool {
        self.rules
            .lock()
            .await
            .values()
            .any(|rule| rule == &(source_address, port))
    }

    /// Simulates an out-of-band removal on the perimeter side.
    pub(crate) async fn drop_rule(&self, perimeter_ref: &str) {
        self.rules.lock().await.remove(perimeter_ref);
    }
}

#[async_trait]
impl PerimeterGateway for FakePerimeterGateway {
    async fn apply_rule(
        &self,
        source_address: SourceAddress,
        port: u16,
        grant_id: GrantId,
    ) -> AppResult<String> {
        if self.fail_apply.load(Ordering::SeqCst) {
            return Err(AppError::Gateway("simulated apply failure".to_owned()));
        }

        let perimeter_ref = format!("rule-{grant_id}");
        self.rules
            .lock()
            .await
            .insert(perimeter_ref.clone(), (source_address, port));
        Ok(perimeter_ref)
    }

    async fn remove_rule(&self, perimeter_ref: &str) -> AppResult<RemoveOutcome> {
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(AppError::Gateway("simulated remove failure".to_owned()));
        }

        if self.rules.lock().await.remove(perimeter_ref).is_some() {
            self.removed_count.fetch_add(1, Ordering::SeqCst);
            Ok(RemoveOutcome::Removed)
        } else {
            Ok(RemoveOutcome::AlreadyAbsent)
        }
    }
}

#[derive(Default)]
pub(crate) struct FakeNotifier {
    events: Mutex<Vec<AccessEvent>>,
    fail: AtomicBool,
}

impl FakeNotifier {
    pub(crate) fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub(crate) async fn event_kinds(&self) -> Vec<AccessEventKind> {
        self.events
            .lock()
            .await
            .iter()
            .map(|event| event.kind)
            .collect()
    }
}

#[async_trait]
impl AccessNotifier for FakeNotifier {
    async fn notify(&self, event: AccessEvent) -> AppResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Internal("simulated notifier outage".to_owned()));
        }

        self.events.lock().await.push(event);
        Ok(())
    }
}

pub(crate) fn lifecycle_config() -> LifecycleConfig {
    let Ok(allow_list) = PortAllowList::new([22, 443, 3389]) else {
        panic!("allow-list must build");
    };
    match LifecycleConfig::new(15, allow_list) {
        Ok(config) => config,
        Err(error) => panic!("lifecycle config must build: {error}"),
    }
}

fn service() -> (
    AccessLifecycleService,
    Arc<FakeGrantStore>,
    Arc<FakePerimeterGateway>,
    Arc<FakeNotifier>,
) {
    let store = Arc::new(FakeGrantStore::default());
    let gateway = Arc::new(FakePerimeterGateway::default());
    let notifier = Arc::new(FakeNotifier::default());
    let lifecycle = AccessLifecycleService::new(
        store.clone(),
        gateway.clone(),
        notifier.clone(),
        lifecycle_config(),
    );
    (lifecycle, store, gateway, notifier)
}

fn request() -> GrantRequest {
    GrantRequest {
        requester: "alice@example.com".to_owned(),
        source_address: "203.0.113.5".to_owned(),
        port: 22,
        reason: "debug".to_owned(),
    }
}

#[tokio::test]
async fn grant_creates_active_record_and_rule() {
    let (lifecycle, store, gateway, notifier) = service();

    let grant = match lifecycle.grant(request()).await {
        Ok(grant) => grant,
        Err(error) => panic!("grant must succeed: {error}"),
    };

    assert_eq!(grant.status, GrantStatus::Active);
    assert_eq!(grant.expires_at, grant.granted_at + chrono::Duration::minutes(15));
    assert!(gateway.has_rule(grant.source_address, 22).await);
    assert_eq!(gateway.rule_count().await, 1);

    let stored = store.find(grant.id).await;
    assert_eq!(stored.ok().flatten(), Some(grant));
    assert_eq!(notifier.event_kinds().await, vec![AccessEventKind::Granted]);
}

#[tokio::test]
async fn grant_rejects_port_outside_allow_list() {
    let (lifecycle, store, gateway, _) = service();

    let result = lifecycle
        .grant(GrantRequest {
            port: 99,
            ..request()
        })
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(gateway.rule_count().await, 0);
    assert!(store.list().await.is_ok_and(|grants| grants.is_empty()));
}

#[tokio::test]
async fn grant_rejects_empty_requester() {
    let (lifecycle, _, gateway, _) = service();

    let result = lifecycle
        .grant(GrantRequest {
            requester: "  ".to_owned(),
            ..request()
        })
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(gateway.rule_count().await, 0);
}

#[tokio::test]
async fn grant_rejects_non_ip_source_address() {
    let (lifecycle, _, gateway, _) = service();

    let result = lifecycle
        .grant(GrantRequest {
            source_address: "bastion.internal".to_owned(),
            ..request()
        })
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(gateway.rule_count().await, 0);
}

#[tokio::test]
async fn grant_surfaces_gateway_failure_without_record() {
    let (lifecycle, store, gateway, notifier) = service();
    gateway.fail_apply(true);

    let result = lifecycle.grant(request()).await;

    assert!(matches!(result, Err(AppError::Gateway(_))));
    assert!(store.list().await.is_ok_and(|grants| grants.is_empty()));
    assert!(notifier.event_kinds().await.is_empty());
}

#[tokio::test]
async fn grant_succeeds_when_notifier_is_down() {
    let (lifecycle, _, _, notifier) = service();
    notifier.fail(true);

    let result = lifecycle.grant(request()).await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn revoke_unknown_grant_is_not_found() {
    let (lifecycle, _, _, _) = service();

    let result = lifecycle.revoke(GrantId::new()).await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn revoke_removes_rule_and_marks_revoked() {
    let (lifecycle, store, gateway, notifier) = service();
    let granted = lifecycle.grant(request()).await;
    let Ok(grant) = granted else {
        panic!("grant must succeed");
    };

    let outcome = lifecycle.revoke(grant.id).await;

    assert_eq!(outcome.ok(), Some(RevokeOutcome::Completed));
    assert_eq!(gateway.rule_count().await, 0);
    assert_eq!(gateway.removed_count(), 1);

    let stored = store.find(grant.id).await.ok().flatten();
    assert!(stored.as_ref().is_some_and(|stored| {
        stored.status == GrantStatus::Revoked && stored.revoked_at.is_some()
    }));
    assert_eq!(
        notifier.event_kinds().await,
        vec![AccessEventKind::Granted, AccessEventKind::Revoked]
    );
}

#[tokio::test]
async fn revoke_twice_is_idempotent() {
    let (lifecycle, _, gateway, _) = service();
    let Ok(grant) = lifecycle.grant(request()).await else {
        panic!("grant must succeed");
    };

    let first = lifecycle.revoke(grant.id).await;
    let second = lifecycle.revoke(grant.id).await;

    assert_eq!(first.ok(), Some(RevokeOutcome::Completed));
    assert_eq!(second.ok(), Some(RevokeOutcome::AlreadyTerminal));
    assert_eq!(gateway.removed_count(), 1);
}

#[tokio::test]
async fn revoke_completes_when_rule_was_removed_out_of_band() {
    let (lifecycle, store, gateway, _) = service();
    let Ok(grant) = lifecycle.grant(request()).await else {
        panic!("grant must succeed");
    };
    gateway.drop_rule(grant.perimeter_ref.as_str()).await;

    let outcome = lifecycle.revoke(grant.id).await;

    assert_eq!(outcome.ok(), Some(RevokeOutcome::Completed));
    assert_eq!(gateway.removed_count(), 0);

    let stored = store.find(grant.id).await.ok().flatten();
    assert!(stored.is_some_and(|stored| stored.status == GrantStatus::Revoked));
}

#[tokio::test]
async fn revoke_gateway_failure_leaves_grant_active_and_retryable() {
    let (lifecycle, store, gateway, _) = service();
    let Ok(grant) = lifecycle.grant(request()).await else {
        panic!("grant must succeed");
    };
    gateway.fail_remove(true);

    let failed = lifecycle.revoke(grant.id).await;
    assert!(matches!(failed, Err(AppError::Gateway(_))));

    let stored = store.find(grant.id).await.ok().flatten();
    assert!(stored.is_some_and(|stored| stored.status == GrantStatus::Active));

    gateway.fail_remove(false);
    let retried = lifecycle.revoke(grant.id).await;
    assert_eq!(retried.ok(), Some(RevokeOutcome::Completed));
    assert_eq!(gateway.removed_count(), 1);
}

#[tokio::test]
async fn expire_writes_expired_status() {
    let (lifecycle, store, _, notifier) = service();
    let Ok(grant) = lifecycle.grant(request()).await else {
        panic!("grant must succeed");
    };

    let outcome = lifecycle.expire(grant.id).await;

    assert_eq!(outcome.ok(), Some(RevokeOutcome::Completed));
    let stored = store.find(grant.id).await.ok().flatten();
    assert!(stored.is_some_and(|stored| stored.status == GrantStatus::Expired));
    assert_eq!(
        notifier.event_kinds().await,
        vec![AccessEventKind::Granted, AccessEventKind::Expired]
    );
}

#[tokio::test]
async fn cas_loser_treats_conflict_as_no_op() {
    let store = Arc::new(FakeGrantStore::default());
    let gateway = Arc::new(FakePerimeterGateway::default());
    let notifier = Arc::new(FakeNotifier::default());
    let winner_side = AccessLifecycleService::new(
        store.clone(),
        gateway.clone(),
        notifier.clone(),
        lifecycle_config(),
    );
    let loser_side = AccessLifecycleService::new(
        Arc::new(AlwaysConflictingStore {
            inner: store.clone(),
        }),
        gateway.clone(),
        notifier.clone(),
        lifecycle_config(),
    );

    let Ok(grant) = winner_side.grant(request()).await else {
        panic!("grant must succeed");
    };

    let outcome = loser_side.revoke(grant.id).await;

    assert_eq!(outcome.ok(), Some(RevokeOutcome::AlreadyTerminal));
    // The loser never writes a terminal event.
    assert_eq!(notifier.event_kinds().await, vec![AccessEventKind::Granted]);
}

#[tokio::test]
async fn racing_manual_revoke_and_expiry_terminate_exactly_once() {
    let (lifecycle, store, gateway, _) = service();
    let Ok(grant) = lifecycle.grant(request()).await else {
        panic!("grant must succeed");
    };

    let (manual, swept) = tokio::join!(lifecycle.revoke(grant.id), lifecycle.expire(grant.id));

    let outcomes = [manual.ok(), swept.ok()];
    let completed = outcomes
        .iter()
        .filter(|outcome| **outcome == Some(RevokeOutcome::Completed))
        .count();
    let no_ops = outcomes
        .iter()
        .filter(|outcome| **outcome == Some(RevokeOutcome::AlreadyTerminal))
        .count();

    assert_eq!(completed, 1);
    assert_eq!(no_ops, 1);
    assert_eq!(gateway.removed_count(), 1);

    let stored = store.find(grant.id).await.ok().flatten();
    assert!(stored.is_some_and(|stored| stored.status.is_terminal()));
}

#[tokio::test]
async fn get_returns_not_found_for_unknown_grant() {
    let (lifecycle, _, _, _) = service();

    let result = lifecycle.get(GrantId::new()).await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}
