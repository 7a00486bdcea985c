//! Bookmark handlers

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{CreateBookmarkRequest, PageParams, UpdateBookmarkRequest};
use super::service::BookmarksService;
use crate::auth::{AuthedUser, OptionalAuthedUser};
use crate::common::{ApiError, AppState};

async fn service(state_lock: &Arc<RwLock<AppState>>) -> BookmarksService {
    let state = state_lock.read().await;
    BookmarksService::new(state.db.clone(), state.events.clone())
}

/// GET /api/bookmarks - Public feed, optionally filtered by tag
pub async fn list_public(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let result = service(&state)
        .await
        .list_public(params.page(), params.size(), params.tag.as_deref())
        .await?;
    Ok(Json(result))
}

/// GET /api/bookmarks/me - The caller's own bookmarks
pub async fn list_mine(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let result = service(&state)
        .await
        .list_for_owner(user.id, params.page(), params.size())
        .await?;
    Ok(Json(result))
}

/// GET /api/bookmarks/saved - Bookmarks the caller has saved
pub async fn list_saved(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let result = service(&state)
        .await
        .list_saved(user.id, params.page(), params.size())
        .await?;
    Ok(Json(result))
}

/// GET /api/bookmarks/users/:username - Public bookmarks of a handle
pub async fn list_for_username(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    Path(username): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let result = service(&state)
        .await
        .list_for_username(&username, params.page(), params.size())
        .await?;
    Ok(Json(result))
}

/// GET /api/bookmarks/:id - Fetch one bookmark, anonymous callers allowed
pub async fn get_bookmark(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    OptionalAuthedUser(user): OptionalAuthedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let result = service(&state).await.get_by_id(id, user.as_ref()).await?;
    Ok(Json(result))
}

/// POST /api/bookmarks - Create a bookmark
pub async fn create_bookmark(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Json(request): Json<CreateBookmarkRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = service(&state).await.create(&user, request).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// PUT /api/bookmarks/:id - Partial update, owner or admin only
pub async fn update_bookmark(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateBookmarkRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = service(&state).await.update(id, &user, request).await?;
    Ok(Json(result))
}

/// DELETE /api/bookmarks/:id - Delete, owner or admin only
pub async fn delete_bookmark(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    service(&state).await.delete(id, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/bookmarks/:id/save - Record a save (idempotent)
pub async fn record_save(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let result = service(&state).await.record_save(id, &user).await?;
    Ok(Json(result))
}

/// DELETE /api/bookmarks/:id/save - Remove a save (idempotent)
pub async fn remove_save(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let result = service(&state).await.remove_save(id, &user).await?;
    Ok(Json(result))
}

/// POST /api/bookmarks/:id/share - Record a share (idempotent)
pub async fn record_share(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let result = service(&state).await.record_share(id, &user).await?;
    Ok(Json(result))
}

/// DELETE /api/bookmarks/:id/share - Remove a share (idempotent)
pub async fn remove_share(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let result = service(&state).await.remove_share(id, &user).await?;
    Ok(Json(result))
}
