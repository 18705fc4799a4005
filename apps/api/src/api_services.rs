use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

use gatelease_application::{
    AccessLifecycleService, AccessNotifier, ExpirySweeper, GrantStore, LifecycleConfig,
    PerimeterGateway,
};
use gatelease_core::{AppError, AppResult};
use gatelease_domain::PortAllowList;
use gatelease_infrastructure::{
    HttpPerimeterGateway, InMemoryGrantStore, InMemoryPerimeterGateway, PostgresGrantStore,
    TracingNotifier, WebhookNotifier,
};

use crate::api_config::{
    ApiConfig, GatewayProviderConfig, NotifierProviderConfig, StoreProviderConfig,
};
use crate::state::AppState;

/// Builds the shared application state from startup configuration.
pub async fn build_state(config: &ApiConfig) -> AppResult<AppState> {
    let store = build_store(&config.store).await?;
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;

    let gateway: Arc<dyn PerimeterGateway> = match &config.gateway {
        GatewayProviderConfig::InMemory => Arc::new(InMemoryPerimeterGateway::new()),
        GatewayProviderConfig::Http {
            base_url,
            perimeter_id,
        } => Arc::new(HttpPerimeterGateway::new(
            http_client.clone(),
            base_url.clone(),
            perimeter_id.clone(),
        )),
    };

    let notifier: Arc<dyn AccessNotifier> = match &config.notifier {
        NotifierProviderConfig::Console => Arc::new(TracingNotifier::new()),
        NotifierProviderConfig::Webhook { webhook_url } => {
            Arc::new(WebhookNotifier::new(http_client, webhook_url.clone()))
        }
    };

    let lifecycle_config = LifecycleConfig::new(
        config.grant_duration_minutes,
        PortAllowList::new(config.allowed_ports.iter().copied())?,
    )?;

    let lifecycle_service =
        AccessLifecycleService::new(store.clone(), gateway, notifier, lifecycle_config);
    let sweeper = ExpirySweeper::new(lifecycle_service.clone(), store);

    Ok(AppState {
        lifecycle_service,
        sweeper,
    })
}

async fn build_store(config: &StoreProviderConfig) -> AppResult<Arc<dyn GrantStore>> {
    match config {
        StoreProviderConfig::InMemory => Ok(Arc::new(InMemoryGrantStore::new())),
        StoreProviderConfig::Postgres { database_url } => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await
                .map_err(|error| {
                    AppError::Store(format!("failed to connect to database: {error}"))
                })?;

            sqlx::migrate!("../../crates/infrastructure/migrations")
                .run(&pool)
                .await
                .map_err(|error| AppError::Store(format!("failed to run migrations: {error}")))?;

            Ok(Arc::new(PostgresGrantStore::new(pool)))
        }
    }
}
