use crate::{AppState, handlers};
use axum::{
    Json, Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that need no bearer token. Article data exposed here is limited to
/// Published articles; the state filter is applied in the article service.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /
        // Service banner.
        .route(
            "/",
            get(|| async { Json(serde_json::json!({ "message": "Markdown Editor API" })) }),
        )
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /api/auth/register
        .route("/api/auth/register", post(handlers::register))
        // POST /api/auth/login
        // Form-encoded username/password in, bearer token out.
        .route("/api/auth/login", post(handlers::login))
        // GET /api/articles/public?tag_id=...
        // Every Published article, optionally filtered by tag.
        .route("/api/articles/public", get(handlers::list_public_articles))
        // GET /api/tags
        .route("/api/tags", get(handlers::list_tags))
        // GET /api/tags/{id}
        .route("/api/tags/{id}", get(handlers::get_tag))
}
