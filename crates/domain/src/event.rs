use chrono::{DateTime, Utc};
use gatelease_core::{GrantId, NonEmptyString};
use serde::{Deserialize, Serialize};

use crate::grant::{AccessGrant, TerminalStatus};
use crate::network::SourceAddress;

/// Kind of lifecycle event delivered to the notifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessEventKind {
    /// A grant was created and its rule applied.
    Granted,
    /// A grant was explicitly revoked.
    Revoked,
    /// A grant was expired by the sweeper.
    Expired,
}

impl AccessEventKind {
    /// Returns a stable transport value for this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::Revoked => "revoked",
            Self::Expired => "expired",
        }
    }
}

impl From<TerminalStatus> for AccessEventKind {
    fn from(value: TerminalStatus) -> Self {
        match value {
            TerminalStatus::Revoked => Self::Revoked,
            TerminalStatus::Expired => Self::Expired,
        }
    }
}

/// Structured lifecycle event, delivered best-effort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessEvent {
    /// Event kind.
    pub kind: AccessEventKind,
    /// Affected grant.
    pub grant_id: GrantId,
    /// Grant owner.
    pub requester: NonEmptyString,
    /// Source IP of the rule.
    pub source_address: SourceAddress,
    /// Port of the rule.
    pub port: u16,
    /// Instant the event occurred.
    pub timestamp: DateTime<Utc>,
}

impl AccessEvent {
    /// Builds an event describing a lifecycle transition of the given grant.
    #[must_use]
    pub fn for_grant(kind: AccessEventKind, grant: &AccessGrant, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind,
            grant_id: grant.id,
            requester: grant.requester.clone(),
            source_address: grant.source_address,
            port: grant.port,
            timestamp,
        }
    }
}
