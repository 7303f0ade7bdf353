pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::optimize::handlers as optimize_handlers;
use crate::payment::handlers as payment_handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    // Multipart bodies must be allowed to exceed the file cap slightly
    // (boundary + job description text); the per-file limit is enforced in
    // the handlers.
    let body_limit = state.config.upload_max_file_size + 1024 * 1024;

    Router::new()
        .route("/health", get(health::health_handler))
        // Optimization API
        .route(
            "/api/v1/resume/upload",
            post(optimize_handlers::handle_upload),
        )
        .route("/api/v1/optimize", post(optimize_handlers::handle_optimize))
        .route(
            "/api/v1/optimize/:id/status",
            get(optimize_handlers::handle_status),
        )
        // Payment API
        .route(
            "/api/v1/payment/create-session",
            post(payment_handlers::handle_create_session),
        )
        .route(
            "/api/v1/payment/webhook",
            post(payment_handlers::handle_webhook),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
