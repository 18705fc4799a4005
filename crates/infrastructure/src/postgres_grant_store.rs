use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use gatelease_application::{GrantStore, StatusTransition};
use gatelease_core::{AppError, AppResult, GrantId, NonEmptyString};
use gatelease_domain::{AccessGrant, GrantStatus, SourceAddress};

/// PostgreSQL-backed durable grant store.
///
/// The compare-and-set is a conditional `UPDATE` on the stored status; a
/// zero row count means another caller already moved the record on.
#[derive(Clone)]
pub struct PostgresGrantStore {
    pool: PgPool,
}

impl PostgresGrantStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AccessGrantRow {
    grant_id: Uuid,
    requester: String,
    source_address: String,
    port: i32,
    reason: String,
    granted_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    revoked_at: Option<DateTime<Utc>>,
    status: String,
    perimeter_ref: String,
}

impl AccessGrantRow {
    fn into_grant(self) -> AppResult<AccessGrant> {
        let port = u16::try_from(self.port).map_err(|_| {
            AppError::Store(format!(
                "grant '{}' carries out-of-range port {}",
                self.grant_id, self.port
            ))
        })?;

        Ok(AccessGrant {
            id: GrantId::from_uuid(self.grant_id),
            requester: NonEmptyString::new(self.requester)?,
            source_address: SourceAddress::parse(self.source_address.as_str())?,
            port,
            reason: self.reason,
            granted_at: self.granted_at,
            expires_at: self.expires_at,
            revoked_at: self.revoked_at,
            status: GrantStatus::from_str(self.status.as_str())?,
            perimeter_ref: self.perimeter_ref,
        })
    }
}

const GRANT_COLUMNS: &str = "grant_id, requester, source_address, port, reason, \
     granted_at, expires_at, revoked_at, status, perimeter_ref";

#[async_trait]
impl GrantStore for PostgresGrantStore {
    async fn put(&self, grant: AccessGrant) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO access_grants (
                grant_id,
                requester,
                source_address,
                port,
                reason,
                granted_at,
                expires_at,
                revoked_at,
                status,
                perimeter_ref
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (grant_id) DO NOTHING
            "#,
        )
        .bind(grant.id.as_uuid())
        .bind(grant.requester.as_str())
        .bind(grant.source_address.to_string())
        .bind(i32::from(grant.port))
        .bind(grant.reason.as_str())
        .bind(grant.granted_at)
        .bind(grant.expires_at)
        .bind(grant.revoked_at)
        .bind(grant.status.as_str())
        .bind(grant.perimeter_ref.as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Store(format!("failed to persist grant '{}': {error}", grant.id))
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "grant '{}' already exists",
                grant.id
            )));
        }

        Ok(())
    }

    async fn find(&self, grant_id: GrantId) -> AppResult<Option<AccessGrant>> {
        let row = sqlx::query_as::<_, AccessGrantRow>(&format!(
            "SELECT {GRANT_COLUMNS} FROM access_grants WHERE grant_id = $1"
        ))
        .bind(grant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Store(format!("failed to load grant '{grant_id}': {error}")))?;

        row.map(AccessGrantRow::into_grant).transpose()
    }

    async fn update_status(
        &self,
        grant_id: GrantId,
        expected: GrantStatus,
        new_status: GrantStatus,
        revoked_at: DateTime<Utc>,
    ) -> AppResult<StatusTransition> {
        let result = sqlx::query(
            r#"
            UPDATE access_grants
            SET status = $3, revoked_at = $4
            WHERE grant_id = $1 AND status = $2
            "#,
        )
        .bind(grant_id.as_uuid())
        .bind(expected.as_str())
        .bind(new_status.as_str())
        .bind(revoked_at)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Store(format!(
                "failed to transition grant '{grant_id}' to {new_status}: {error}"
            ))
        })?;

        if result.rows_affected() == 0 {
            return Ok(StatusTransition::Conflict);
        }

        Ok(StatusTransition::Applied)
    }

    async fn list_expired_active(&self, now: DateTime<Utc>) -> AppResult<Vec<AccessGrant>> {
        let rows = sqlx::query_as::<_, AccessGrantRow>(&format!(
            r#"
            SELECT {GRANT_COLUMNS}
            FROM access_grants
            WHERE status = 'ACTIVE' AND expires_at <= $1
            ORDER BY expires_at ASC
            "#
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Store(format!("failed to query expired grants: {error}")))?;

        rows.into_iter().map(AccessGrantRow::into_grant).collect()
    }

    async fn list(&self) -> AppResult<Vec<AccessGrant>> {
        let rows = sqlx::query_as::<_, AccessGrantRow>(&format!(
            "SELECT {GRANT_COLUMNS} FROM access_grants ORDER BY granted_at ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Store(format!("failed to list grants: {error}")))?;

        rows.into_iter().map(AccessGrantRow::into_grant).collect()
    }
}
