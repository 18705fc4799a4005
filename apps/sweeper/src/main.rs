//! Gatelease expiry sweeper runtime.
//!
//! Polls the durable grant store on a fixed interval and drives every
//! overdue grant through the lifecycle engine's expire path.

#![forbid(unsafe_code)]

use std::env;
use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use gatelease_application::{
    AccessLifecycleService, AccessNotifier, ExpirySweeper, GrantStore, LifecycleConfig,
    PerimeterGateway,
};
use gatelease_core::{AppError, AppResult};
use gatelease_domain::PortAllowList;
use gatelease_infrastructure::{
    HttpPerimeterGateway, InMemoryPerimeterGateway, PostgresGrantStore, TracingNotifier,
    WebhookNotifier,
};

#[derive(Debug, Clone)]
struct SweeperConfig {
    database_url: String,
    sweep_interval_seconds: u64,
    grant_duration_minutes: u32,
    allowed_ports: Vec<u16>,
    gateway_base_url: Option<String>,
    perimeter_id: Option<String>,
    notifier_webhook_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = SweeperConfig::load()?;
    let sweeper = build_sweeper(&config).await?;

    info!(
        sweep_interval_seconds = config.sweep_interval_seconds,
        "gatelease-sweeper started"
    );

    loop {
        match sweeper.sweep_once().await {
            Ok(report) => {
                if report.expired_count > 0 || report.failed_count > 0 {
                    info!(
                        expired_count = report.expired_count,
                        failed_count = report.failed_count,
                        "sweep run finished"
                    );
                }
            }
            Err(error) => {
                warn!(error = %error, "sweep run failed; retrying on the next interval");
            }
        }

        tokio::time::sleep(Duration::from_secs(config.sweep_interval_seconds)).await;
    }
}

async fn build_sweeper(config: &SweeperConfig) -> AppResult<ExpirySweeper> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(config.database_url.as_str())
        .await
        .map_err(|error| AppError::Store(format!("failed to connect to database: {error}")))?;

    let store: Arc<dyn GrantStore> = Arc::new(PostgresGrantStore::new(pool));

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;

    let gateway: Arc<dyn PerimeterGateway> = match (&config.gateway_base_url, &config.perimeter_id)
    {
        (Some(base_url), Some(perimeter_id)) => Arc::new(HttpPerimeterGateway::new(
            http_client.clone(),
            base_url.clone(),
            perimeter_id.clone(),
        )),
        _ => Arc::new(InMemoryPerimeterGateway::new()),
    };

    let notifier: Arc<dyn AccessNotifier> = match &config.notifier_webhook_url {
        Some(webhook_url) => Arc::new(WebhookNotifier::new(http_client, webhook_url.clone())),
        None => Arc::new(TracingNotifier::new()),
    };

    let lifecycle_config = LifecycleConfig::new(
        config.grant_duration_minutes,
        PortAllowList::new(config.allowed_ports.iter().copied())?,
    )?;

    let lifecycle = AccessLifecycleService::new(store.clone(), gateway, notifier, lifecycle_config);

    Ok(ExpirySweeper::new(lifecycle, store))
}

impl SweeperConfig {
    fn load() -> AppResult<Self> {
        let database_url = required_env("DATABASE_URL")?;
        let sweep_interval_seconds = parse_env_u64("SWEEP_INTERVAL_SECONDS", 300)?;
        let grant_duration_minutes = parse_env_u32("GRANT_DURATION_MINUTES", 15)?;
        let allowed_ports = parse_ports(required_env("ALLOWED_PORTS")?.as_str())?;

        if sweep_interval_seconds == 0 {
            return Err(AppError::Validation(
                "SWEEP_INTERVAL_SECONDS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            database_url,
            sweep_interval_seconds,
            grant_duration_minutes,
            allowed_ports,
            gateway_base_url: optional_env("GATEWAY_BASE_URL"),
            perimeter_id: optional_env("PERIMETER_ID"),
            notifier_webhook_url: optional_env("NOTIFIER_WEBHOOK_URL"),
        })
    }
}

fn parse_ports(value: &str) -> AppResult<Vec<u16>> {
    let ports = value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry.parse::<u16>().map_err(|error| {
                AppError::Validation(format!("invalid port '{entry}' in ALLOWED_PORTS: {error}"))
            })
        })
        .collect::<AppResult<Vec<u16>>>()?;

    if ports.is_empty() {
        return Err(AppError::Validation(
            "ALLOWED_PORTS must list at least one port".to_owned(),
        ));
    }

    Ok(ports)
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> AppResult<String> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn optional_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_env_u32(name: &str, default: u32) -> AppResult<u32> {
    match env::var(name) {
        Ok(value) => value.parse::<u32>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}

fn parse_env_u64(name: &str, default: u64) -> AppResult<u64> {
    match env::var(name) {
        Ok(value) => value.parse::<u64>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}
