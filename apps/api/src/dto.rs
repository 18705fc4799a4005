use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gatelease_application::SweepReport;
use gatelease_domain::AccessGrant;

/// Health probe payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Fixed status marker.
    pub status: &'static str,
}

/// Inbound grant request body.
#[derive(Debug, Deserialize)]
pub struct CreateGrantRequest {
    /// Identity requesting access.
    pub requester: String,
    /// Source IP, textual form.
    pub source_address: String,
    /// Port to open.
    pub port: u16,
    /// Free-text justification.
    #[serde(default)]
    pub reason: String,
}

/// Grant projection returned to callers.
#[derive(Debug, Serialize)]
pub struct GrantResponse {
    /// Stable grant id.
    pub grant_id: String,
    /// Grant owner.
    pub requester: String,
    /// Source IP of the rule.
    pub source_address: String,
    /// Port the rule opens.
    pub port: u16,
    /// Stored justification.
    pub reason: String,
    /// Lifecycle status.
    pub status: String,
    /// Creation instant.
    pub granted_at: DateTime<Utc>,
    /// Expiry instant.
    pub expires_at: DateTime<Utc>,
    /// Terminal transition instant, when present.
    pub revoked_at: Option<DateTime<Utc>>,
}

impl From<AccessGrant> for GrantResponse {
    fn from(value: AccessGrant) -> Self {
        Self {
            grant_id: value.id.to_string(),
            requester: value.requester.into(),
            source_address: value.source_address.to_string(),
            port: value.port,
            reason: value.reason,
            status: value.status.as_str().to_owned(),
            granted_at: value.granted_at,
            expires_at: value.expires_at,
            revoked_at: value.revoked_at,
        }
    }
}

/// Sweep trigger response.
#[derive(Debug, Serialize)]
pub struct SweepResponse {
    /// Grants expired during this run.
    pub expired_count: u32,
    /// Grants whose expiry failed this run.
    pub failed_count: u32,
}

impl From<SweepReport> for SweepResponse {
    fn from(value: SweepReport) -> Self {
        Self {
            expired_count: value.expired_count,
            failed_count: value.failed_count,
        }
    }
}
