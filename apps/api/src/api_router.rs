use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health::health_handler))
        .route(
            "/api/grants",
            post(handlers::grants::create_grant_handler)
                .get(handlers::grants::list_grants_handler),
        )
        .route(
            "/api/grants/{grant_id}",
            get(handlers::grants::get_grant_handler)
                .delete(handlers::grants::revoke_grant_handler),
        )
        .route("/api/internal/sweep", post(handlers::sweep::sweep_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
