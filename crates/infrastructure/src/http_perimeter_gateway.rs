use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use gatelease_application::{PerimeterGateway, RemoveOutcome};
use gatelease_core::{AppError, AppResult, GrantId};
use gatelease_domain::SourceAddress;

/// HTTP adapter for an external firewall controller.
///
/// Applies rules with `PUT {base}/perimeters/{perimeter}/rules` and removes
/// them with `DELETE {base}/rules/{ref}`. A 404 on delete is the controller
/// saying the rule is already gone and maps to
/// [`RemoveOutcome::AlreadyAbsent`]; every other non-success status is a
/// gateway error.
pub struct HttpPerimeterGateway {
    http_client: reqwest::Client,
    base_url: String,
    perimeter_id: String,
}

#[derive(Debug, Serialize)]
struct ApplyRuleRequest<'a> {
    cidr: String,
    port: u16,
    description: String,
    grant_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApplyRuleResponse {
    rule_ref: String,
}

impl HttpPerimeterGateway {
    /// Creates a gateway adapter targeting one named perimeter object.
    #[must_use]
    pub fn new(http_client: reqwest::Client, base_url: String, perimeter_id: String) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            perimeter_id,
        }
    }
}

#[async_trait]
impl PerimeterGateway for HttpPerimeterGateway {
    async fn apply_rule(
        &self,
        source_address: SourceAddress,
        port: u16,
        grant_id: GrantId,
    ) -> AppResult<String> {
        let endpoint = format!(
            "{}/perimeters/{}/rules",
            self.base_url, self.perimeter_id
        );
        let grant_id = grant_id.to_string();

        let response = self
            .http_client
            .put(endpoint)
            .json(&ApplyRuleRequest {
                cidr: source_address.cidr().to_string(),
                port,
                description: format!("jit-{grant_id}"),
                grant_id: grant_id.as_str(),
            })
            .send()
            .await
            .map_err(|error| {
                AppError::Gateway(format!("failed to call perimeter controller: {error}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_owned());
            return Err(AppError::Gateway(format!(
                "perimeter controller rejected rule with status {}: {body}",
                status.as_u16()
            )));
        }

        let body = response
            .json::<ApplyRuleResponse>()
            .await
            .map_err(|error| {
                AppError::Gateway(format!(
                    "failed to parse perimeter controller response: {error}"
                ))
            })?;

        Ok(body.rule_ref)
    }

    async fn remove_rule(&self, perimeter_ref: &str) -> AppResult<RemoveOutcome> {
        let endpoint = format!("{}/rules/{perimeter_ref}", self.base_url);

        let response = self
            .http_client
            .delete(endpoint)
            .send()
            .await
            .map_err(|error| {
                AppError::Gateway(format!("failed to call perimeter controller: {error}"))
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(RemoveOutcome::AlreadyAbsent);
        }

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_owned());
            return Err(AppError::Gateway(format!(
                "perimeter controller failed rule removal with status {}: {body}",
                status.as_u16()
            )));
        }

        Ok(RemoveOutcome::Removed)
    }
}
