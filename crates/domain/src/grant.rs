use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use gatelease_core::{AppError, GrantId, NonEmptyString};
use serde::{Deserialize, Serialize};

use crate::network::SourceAddress;

/// Lifecycle status of an access grant.
///
/// A grant is `Active` from creation until exactly one terminal transition:
/// `Revoked` for an explicit caller action, `Expired` for the sweeper path.
/// Terminal records are never mutated again and never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GrantStatus {
    /// Grant is live and its perimeter rule is expected to exist.
    Active,
    /// Grant was ended by an explicit revoke call.
    Revoked,
    /// Grant was ended by the expiry sweeper.
    Expired,
}

impl GrantStatus {
    /// Returns a stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Revoked => "REVOKED",
            Self::Expired => "EXPIRED",
        }
    }

    /// Returns whether this status is terminal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }
}

impl Display for GrantStatus {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.as_str())
    }
}

impl FromStr for GrantStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ACTIVE" => Ok(Self::Active),
            "REVOKED" => Ok(Self::Revoked),
            "EXPIRED" => Ok(Self::Expired),
            _ => Err(AppError::Validation(format!(
                "unknown grant status value '{value}'"
            ))),
        }
    }
}

/// The two terminal statuses a grant can transition to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalStatus {
    /// Explicit caller-initiated revocation.
    Revoked,
    /// Sweeper-driven expiry.
    Expired,
}

impl TerminalStatus {
    /// Returns the grant status this terminal transition writes.
    #[must_use]
    pub fn as_status(&self) -> GrantStatus {
        match self {
            Self::Revoked => GrantStatus::Revoked,
            Self::Expired => GrantStatus::Expired,
        }
    }
}

/// A single temporary network access authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGrant {
    /// Stable grant identifier.
    pub id: GrantId,
    /// Identity that requested and owns the grant.
    pub requester: NonEmptyString,
    /// Source IP the perimeter rule is scoped to.
    pub source_address: SourceAddress,
    /// Port the rule opens.
    pub port: u16,
    /// Free-text justification, stored for audit, never validated.
    pub reason: String,
    /// Creation instant.
    pub granted_at: DateTime<Utc>,
    /// Expiry instant, fixed at creation.
    pub expires_at: DateTime<Utc>,
    /// Instant of the terminal transition, absent while active.
    pub revoked_at: Option<DateTime<Utc>>,
    /// Current lifecycle status.
    pub status: GrantStatus,
    /// Gateway-side identifier of the applied rule.
    pub perimeter_ref: String,
}

impl AccessGrant {
    /// Creates a new active grant expiring after the configured duration.
    ///
    /// The id is generated before the perimeter rule is applied so the
    /// gateway can tag the rule with it.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: GrantId,
        requester: NonEmptyString,
        source_address: SourceAddress,
        port: u16,
        reason: String,
        perimeter_ref: String,
        granted_at: DateTime<Utc>,
        duration_minutes: u32,
    ) -> Self {
        Self {
            id,
            requester,
            source_address,
            port,
            reason,
            granted_at,
            expires_at: granted_at + Duration::minutes(i64::from(duration_minutes)),
            revoked_at: None,
            status: GrantStatus::Active,
            perimeter_ref,
        }
    }

    /// Returns whether the grant is past its expiry instant.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
