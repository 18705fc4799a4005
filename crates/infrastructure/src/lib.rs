//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod http_perimeter_gateway;
mod in_memory_grant_store;
mod in_memory_perimeter_gateway;
mod postgres_grant_store;
mod tracing_notifier;
mod webhook_notifier;

pub use http_perimeter_gateway::HttpPerimeterGateway;
pub use in_memory_grant_store::InMemoryGrantStore;
pub use in_memory_perimeter_gateway::InMemoryPerimeterGateway;
pub use postgres_grant_store::PostgresGrantStore;
pub use tracing_notifier::TracingNotifier;
pub use webhook_notifier::WebhookNotifier;
