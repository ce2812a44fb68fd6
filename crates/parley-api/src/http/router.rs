//! Axum router configuration with middleware.
//!
//! The main listener serves the JSON API under `/api/`, the WebSocket relay at
//! `/ws`, and the frontend directory (when it exists) for every other path.
//! The dedicated WebSocket listener only exposes `/ws`.

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::http::handlers::meta::WS_PATH;
use crate::state::AppState;

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the main listener's router.
pub fn build_router(state: AppState) -> Router {
    let frontend_dir = state.config.server.frontend_dir.clone();

    let api_routes = Router::new()
        .route("/chat", post(handlers::chat::chat))
        .route("/session", get(handlers::session::get_session))
        .route("/config", get(handlers::meta::get_config))
        .route("/health", get(handlers::meta::health));

    let mut router = Router::new()
        .nest("/api", api_routes)
        .route(WS_PATH, get(handlers::ws::ws_handler))
        .layer(cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let frontend = std::path::Path::new(&frontend_dir);
    if frontend.is_dir() {
        let index_path = frontend.join("index.html");
        let serve_dir = ServeDir::new(frontend).fallback(ServeFile::new(index_path));
        router = router.fallback_service(serve_dir);
        tracing::info!(path = %frontend_dir, "Frontend static file serving enabled");
    } else {
        tracing::debug!(path = %frontend_dir, "Frontend directory not found, serving API only");
    }

    router
}

/// Build the dedicated WebSocket listener's router.
pub fn build_ws_router(state: AppState) -> Router {
    Router::new()
        .route(WS_PATH, get(handlers::ws::ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
