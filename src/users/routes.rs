//! User profile routes

use axum::{routing::get, Router};

use super::handlers;

/// Creates and returns the users router
pub fn users_routes() -> Router {
    Router::new()
        .route(
            "/api/users/me",
            get(handlers::get_me).put(handlers::update_me),
        )
        .route("/api/users/:id", get(handlers::get_public))
}
