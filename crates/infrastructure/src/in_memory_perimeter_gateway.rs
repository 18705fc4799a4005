use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use gatelease_application::{PerimeterGateway, RemoveOutcome};
use gatelease_core::{AppResult, GrantId};
use gatelease_domain::SourceAddress;

/// In-memory perimeter gateway for development and tests.
///
/// Keeps applied rules in a map keyed by their reference; removing an unknown
/// reference reports [`RemoveOutcome::AlreadyAbsent`], matching the contract
/// a real firewall adapter must uphold.
#[derive(Debug, Default)]
pub struct InMemoryPerimeterGateway {
    rules: RwLock<HashMap<String, (SourceAddress, u16)>>,
}

impl InMemoryPerimeterGateway {
    /// Creates an empty gateway.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(HashMap::new()),
        }
    }

    /// Returns whether a rule for the given scope currently exists.
    pub async fn has_rule(&self, source_address: SourceAddress, port: u16) -> bool {
        self.rules
            .read()
            .await
            .values()
            .any(|rule| rule == &(source_address, port))
    }

    /// Returns the number of live rules.
    pub async fn rule_count(&self) -> usize {
        self.rules.read().await.len()
    }
}

#[async_trait]
impl PerimeterGateway for InMemoryPerimeterGateway {
    async fn apply_rule(
        &self,
        source_address: SourceAddress,
        port: u16,
        grant_id: GrantId,
    ) -> AppResult<String> {
        let perimeter_ref = format!("mem-rule-{grant_id}");
        self.rules
            .write()
            .await
            .insert(perimeter_ref.clone(), (source_address, port));

        info!(
            perimeter_ref = %perimeter_ref,
            cidr = %source_address.cidr(),
            port = port,
            "applied in-memory perimeter rule"
        );

        Ok(perimeter_ref)
    }

    async fn remove_rule(&self, perimeter_ref: &str) -> AppResult<RemoveOutcome> {
        if self.rules.write().await.remove(perimeter_ref).is_some() {
            info!(perimeter_ref = %perimeter_ref, "removed in-memory perimeter rule");
            Ok(RemoveOutcome::Removed)
        } else {
            Ok(RemoveOutcome::AlreadyAbsent)
        }
    }
}
