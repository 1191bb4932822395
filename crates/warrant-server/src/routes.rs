//! Route definitions.

use axum::Router;
use axum::routing::{delete, get, post};
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Create the HTTP router.
pub fn create_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route(
            "/tokens",
            post(handlers::generate_token).get(handlers::list_tokens),
        )
        .route("/tokens/{token}", delete(handlers::remove_token))
        .route("/verify", post(handlers::verify_token))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
