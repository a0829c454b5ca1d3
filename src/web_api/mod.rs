//! WebAPI - REST API Endpoints
//!
//! ## Responsibilities
//!
//! - HTTP routes over the session registry
//! - Request validation
//! - Response formatting
//! - CORS, tracing and static frontend serving

mod routes;

pub use routes::create_router;

use axum::extract::{DefaultBodyLimit, State};
use axum::response::IntoResponse;
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "active_sessions": state.registry.active_count(),
    }))
}

/// Full application: API routes plus body limit, CORS, static files and tracing
pub fn build_app(state: AppState) -> Router {
    let server = state.config.server.clone();
    let mut app = create_router(state).layer(DefaultBodyLimit::max(server.max_body_mb * 1024 * 1024));

    if let Some(static_dir) = &server.static_dir {
        let serve_dir = ServeDir::new(static_dir).not_found_service(ServeFile::new(static_dir.join("index.html")));
        app = app.fallback_service(serve_dir);
        tracing::info!(static_dir = %static_dir.display(), "Static file serving enabled");
    }

    if server.cors_permissive {
        app = app.layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));
    }

    app.layer(TraceLayer::new_for_http())
}
