//! Authentication handlers

use axum::extract::{Extension, Json};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use super::extractors::AuthedUser;
use super::models::{AuthResponse, GoogleAuthRequest, User, UserSummary};
use super::service::AuthService;
use crate::common::{ApiError, AppState};

/// POST /api/auth/google
/// Exchanges a Google ID token for a session token
///
/// # Request Body
/// ```json
/// {
///   "idToken": "<google id token>",
///   "username": "<optional requested handle>"
/// }
/// ```
pub async fn google_auth(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Json(payload): Json<GoogleAuthRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    info!("Received Google sign-in request");

    if payload.id_token.trim().is_empty() {
        return Err(ApiError::BadRequest("idToken is required".to_string()));
    }

    let state = state_lock.read().await.clone();
    let service = AuthService::new(
        state.db.clone(),
        state.google_verifier.clone(),
        state.session_tokens.clone(),
    );

    let response = service.authenticate_with_google(payload).await?;

    Ok(Json(response))
}

/// GET /api/me
/// Returns the current authenticated account's summary and role
pub async fn me_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let state = state_lock.read().await.clone();

    let user: User = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(authed.id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let resp = serde_json::json!({
        "user": UserSummary::from(&user),
        "role": user.role,
    });
    Ok(Json(resp))
}
