use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Demo call control
        .route("/demo", get(handlers::get_demo))
        .route("/demo/start", post(handlers::start_demo))
        .route("/demo/confirm", post(handlers::confirm_call))
        .route("/demo/cancel", post(handlers::cancel_call))
        .route("/demo/mute", post(handlers::toggle_mute))
        .route("/demo/end", post(handlers::end_call))
        .route("/demo/reset", post(handlers::reset_demo))
        // Waitlist
        .route("/waitlist", post(handlers::join_waitlist))
        // Request logging, and CORS for a browser front end on another origin
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
