use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::state::AppState;
use super::{api, ws};

/// Build the complete axum Router.
pub fn build(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws::upgrade))
        .route("/logs", get(api::logs))
        .route("/health", get(api::health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
