use std::env;

use gatelease_core::{AppError, AppResult};

/// Grant store selection.
#[derive(Debug, Clone)]
pub enum StoreProviderConfig {
    /// Volatile in-memory store for development.
    InMemory,
    /// Durable PostgreSQL store.
    Postgres {
        /// Connection string.
        database_url: String,
    },
}

/// Perimeter gateway selection.
#[derive(Debug, Clone)]
pub enum GatewayProviderConfig {
    /// In-process gateway for development.
    InMemory,
    /// External firewall controller over HTTP.
    Http {
        /// Controller base URL.
        base_url: String,
        /// Named perimeter object rules are applied to.
        perimeter_id: String,
    },
}

/// Notifier selection.
#[derive(Debug, Clone)]
pub enum NotifierProviderConfig {
    /// Log events to the console.
    Console,
    /// POST events to a webhook.
    Webhook {
        /// Webhook endpoint.
        webhook_url: String,
    },
}

/// API runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind host.
    pub api_host: String,
    /// Bind port.
    pub api_port: u16,
    /// Fixed grant duration in minutes.
    pub grant_duration_minutes: u32,
    /// Ports a grant may open.
    pub allowed_ports: Vec<u16>,
    /// Store provider.
    pub store: StoreProviderConfig,
    /// Gateway provider.
    pub gateway: GatewayProviderConfig,
    /// Notifier provider.
    pub notifier: NotifierProviderConfig,
}

impl ApiConfig {
    /// Loads configuration from the environment.
    pub fn load() -> AppResult<Self> {
        let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let api_port = env::var("API_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3001);

        let grant_duration_minutes = parse_env_u32("GRANT_DURATION_MINUTES", 15)?;
        let allowed_ports = parse_ports(required_env("ALLOWED_PORTS")?.as_str())?;

        Ok(Self {
            api_host,
            api_port,
            grant_duration_minutes,
            allowed_ports,
            store: load_store_provider()?,
            gateway: load_gateway_provider()?,
            notifier: load_notifier_provider()?,
        })
    }
}

/// Parses a comma-separated port list such as `22,443,3389`.
pub fn parse_ports(value: &str) -> AppResult<Vec<u16>> {
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

fn load_store_provider() -> AppResult<StoreProviderConfig> {
    match env::var("STORE_PROVIDER")
        .unwrap_or_else(|_| "memory".to_owned())
        .as_str()
    {
        "memory" => Ok(StoreProviderConfig::InMemory),
        "postgres" => Ok(StoreProviderConfig::Postgres {
            database_url: required_env("DATABASE_URL")?,
        }),
        other => Err(AppError::Validation(format!(
            "STORE_PROVIDER must be either 'memory' or 'postgres', got '{other}'"
        ))),
    }
}

fn load_gateway_provider() -> AppResult<GatewayProviderConfig> {
    match env::var("GATEWAY_PROVIDER")
        .unwrap_or_else(|_| "memory".to_owned())
        .as_str()
    {
        "memory" => Ok(GatewayProviderConfig::InMemory),
        "http" => Ok(GatewayProviderConfig::Http {
            base_url: required_env("GATEWAY_BASE_URL")?,
            perimeter_id: required_env("PERIMETER_ID")?,
        }),
        other => Err(AppError::Validation(format!(
            "GATEWAY_PROVIDER must be either 'memory' or 'http', got '{other}'"
        ))),
    }
}

fn load_notifier_provider() -> AppResult<NotifierProviderConfig> {
    match env::var("NOTIFIER_PROVIDER")
        .unwrap_or_else(|_| "console".to_owned())
        .as_str()
    {
        "console" => Ok(NotifierProviderConfig::Console),
        "webhook" => Ok(NotifierProviderConfig::Webhook {
            webhook_url: required_env("NOTIFIER_WEBHOOK_URL")?,
        }),
        other => Err(AppError::Validation(format!(
            "NOTIFIER_PROVIDER must be either 'console' or 'webhook', got '{other}'"
        ))),
    }
}

fn required_env(name: &str) -> AppResult<String> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn parse_env_u32(name: &str, default: u32) -> AppResult<u32> {
    match env::var(name) {
        Ok(value) => value.parse::<u32>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}
