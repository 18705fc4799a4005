use gatelease_application::{AccessLifecycleService, ExpirySweeper};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// The access lifecycle engine.
    pub lifecycle_service: AccessLifecycleService,
    /// The expiry sweeper, exposed for the scheduled sweep trigger.
    pub sweeper: ExpirySweeper,
}
