//! Axum router configuration with middleware.
//!
//! Middleware: CORS, request tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the web channel router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/invite/{token}", get(handlers::web::invite_status))
        .route("/join", post(handlers::web::join_game))
        .route("/messages", get(handlers::web::last_messages))
        .route("/send", post(handlers::web::send_theme))
        .route("/spyfall", post(handlers::web::send_spyfall_location))
        .route("/numbers", post(handlers::web::send_numbers))
        .route("/leave", post(handlers::web::leave_game))
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health
async fn health_check() -> &'static str {
    "ok"
}
