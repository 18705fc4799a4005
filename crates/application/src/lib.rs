//! Application services and ports for the access lifecycle.

#![forbid(unsafe_code)]

mod expiry_sweeper;
mod lifecycle_config;
mod lifecycle_ports;
mod lifecycle_service;

pub use expiry_sweeper::{ExpirySweeper, SweepReport};
pub use lifecycle_config::LifecycleConfig;
pub use lifecycle_ports::{
    AccessNotifier, GrantRequest, GrantStore, PerimeterGateway, RemoveOutcome, StatusTransition,
};
pub use lifecycle_service::{AccessLifecycleService, RevokeOutcome};
