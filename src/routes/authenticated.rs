use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Every route here sits behind `auth_middleware`, so a request only reaches a
/// handler with a valid bearer token for a user that still exists. Ownership of
/// individual articles is checked in the article service, after the existence check.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /api/auth/me
        .route("/api/auth/me", get(handlers::get_me))
        // GET/POST /api/articles
        // List the caller's own articles (drafts included) or create a new Draft.
        .route(
            "/api/articles",
            get(handlers::list_my_articles).post(handlers::create_article),
        )
        // GET/PUT/DELETE /api/articles/{id}
        // Read (owner, or anyone once Published), partial update and delete (owner only).
        .route(
            "/api/articles/{id}",
            get(handlers::get_article)
                .put(handlers::update_article)
                .delete(handlers::delete_article),
        )
        // POST /api/articles/{id}/publish and /unpublish
        // Idempotent state transitions, owner only.
        .route("/api/articles/{id}/publish", post(handlers::publish_article))
        .route(
            "/api/articles/{id}/unpublish",
            post(handlers::unpublish_article),
        )
        // POST /api/tags, PUT/DELETE /api/tags/{id}
        // Tag mutation is open to any authenticated user.
        .route("/api/tags", post(handlers::create_tag))
        .route(
            "/api/tags/{id}",
            put(handlers::update_tag).delete(handlers::delete_tag),
        )
}
