//! Bookmark data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::common::helpers::tags_from_json;

/// Read-access gate for a bookmark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Visibility {
    Public,
    Private,
}

/// Bookmark database model. Owner display fields are snapshotted at write
/// time; tags are stored as a JSON array in a TEXT column.
#[derive(FromRow, Debug, Clone)]
pub struct Bookmark {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub owner_name: String,
    pub owner_username: String,
    pub owner_avatar_url: Option<String>,
    pub title: String,
    pub url: String,
    pub description: String,
    pub visibility: Visibility,
    pub tags: String,
    pub saved_count: i64,
    pub shared_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBookmarkRequest {
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub visibility: Option<Visibility>,
}

/// Partial update: absent fields are left untouched
#[derive(Debug, Deserialize)]
pub struct UpdateBookmarkRequest {
    pub title: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub visibility: Option<Visibility>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkOwner {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub avatar_url: Option<String>,
}

/// Public representation of a bookmark
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkResponse {
    pub id: Uuid,
    pub title: String,
    pub url: String,
    pub description: String,
    pub tags: Vec<String>,
    pub visibility: Visibility,
    pub saved_count: i64,
    pub shared_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub owner: BookmarkOwner,
}

impl From<Bookmark> for BookmarkResponse {
    fn from(bookmark: Bookmark) -> Self {
        Self {
            id: bookmark.id,
            title: bookmark.title,
            url: bookmark.url,
            description: bookmark.description,
            tags: tags_from_json(&bookmark.tags),
            visibility: bookmark.visibility,
            saved_count: bookmark.saved_count,
            shared_count: bookmark.shared_count,
            created_at: bookmark.created_at,
            updated_at: bookmark.updated_at,
            owner: BookmarkOwner {
                id: bookmark.owner_id,
                name: bookmark.owner_name,
                username: bookmark.owner_username,
                avatar_url: bookmark.owner_avatar_url,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BookmarkListResponse {
    pub items: Vec<BookmarkResponse>,
    pub page: i64,
    pub size: i64,
    pub total: i64,
}

/// Query parameters for paginated listings
#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub tag: Option<String>,
}

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

impl PageParams {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(0).max(0)
    }

    pub fn size(&self) -> i64 {
        self.size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }
}
