//! User profile handlers

use axum::{
    extract::{Extension, Path},
    Json,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{UpdateProfileRequest, UserProfileResponse};
use super::service::UsersService;
use crate::auth::AuthedUser;
use crate::common::{ApiError, AppState};

/// GET /api/users/me - The caller's own profile
pub async fn get_me(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
) -> Result<Json<UserProfileResponse>, ApiError> {
    let db = state.read().await.db.clone();
    let profile = UsersService::new(db).get_profile(user.id).await?;
    Ok(Json(profile))
}

/// PUT /api/users/me - Partial update of the caller's profile
pub async fn update_me(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<UserProfileResponse>, ApiError> {
    let db = state.read().await.db.clone();
    let profile = UsersService::new(db).update_profile(user.id, request).await?;
    Ok(Json(profile))
}

/// GET /api/users/:id - Public profile by account id
pub async fn get_public(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserProfileResponse>, ApiError> {
    let db = state.read().await.db.clone();
    let profile = UsersService::new(db).get_profile(id).await?;
    Ok(Json(profile))
}
