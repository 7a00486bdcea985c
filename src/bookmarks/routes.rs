//! Bookmark routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Creates and returns the bookmarks router
pub fn bookmarks_routes() -> Router {
    Router::new()
        .route(
            "/api/bookmarks",
            get(handlers::list_public).post(handlers::create_bookmark),
        )
        .route("/api/bookmarks/me", get(handlers::list_mine))
        .route("/api/bookmarks/saved", get(handlers::list_saved))
        .route(
            "/api/bookmarks/users/:username",
            get(handlers::list_for_username),
        )
        .route(
            "/api/bookmarks/:id",
            get(handlers::get_bookmark)
                .put(handlers::update_bookmark)
                .delete(handlers::delete_bookmark),
        )
        .route(
            "/api/bookmarks/:id/save",
            post(handlers::record_save).delete(handlers::remove_save),
        )
        .route(
            "/api/bookmarks/:id/share",
            post(handlers::record_share).delete(handlers::remove_share),
        )
}
