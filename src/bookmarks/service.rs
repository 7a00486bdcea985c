//! Bookmark authorization, CRUD, and idempotent interaction toggles

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use super::models::{
    Bookmark, BookmarkListResponse, BookmarkResponse, CreateBookmarkRequest,
    UpdateBookmarkRequest, Visibility,
};
use super::validators::{normalize_tags, parse_url, BookmarkValidator};
use crate::auth::AuthedUser;
use crate::common::helpers::tags_to_json;
use crate::common::{ApiError, Validator};
use crate::services::EventPublisher;

/// The two interaction kinds are structurally identical; the kind picks the
/// join table, the counter column, and the event topic.
#[derive(Debug, Clone, Copy)]
enum InteractionKind {
    Save,
    Share,
}

impl InteractionKind {
    fn table(&self) -> &'static str {
        match self {
            InteractionKind::Save => "bookmark_saves",
            InteractionKind::Share => "bookmark_shares",
        }
    }

    fn counter(&self) -> &'static str {
        match self {
            InteractionKind::Save => "saved_count",
            InteractionKind::Share => "shared_count",
        }
    }
}

pub struct BookmarksService {
    db: SqlitePool,
    events: EventPublisher,
}

impl BookmarksService {
    pub fn new(db: SqlitePool, events: EventPublisher) -> Self {
        Self { db, events }
    }

    // ========================================================================
    // Listings
    // ========================================================================

    /// Public feed, optionally filtered by tag, newest first
    pub async fn list_public(
        &self,
        page: i64,
        size: i64,
        tag: Option<&str>,
    ) -> Result<BookmarkListResponse, ApiError> {
        let tag = tag.map(|t| t.trim().to_lowercase()).filter(|t| !t.is_empty());

        let (items, total) = match tag {
            Some(tag) => {
                let items: Vec<Bookmark> = sqlx::query_as(
                    r#"
                    SELECT * FROM bookmarks
                    WHERE visibility = 'PUBLIC'
                      AND EXISTS (SELECT 1 FROM json_each(bookmarks.tags)
                                  WHERE json_each.value = ?)
                    ORDER BY created_at DESC
                    LIMIT ? OFFSET ?
                    "#,
                )
                .bind(&tag)
                .bind(size)
                .bind(page * size)
                .fetch_all(&self.db)
                .await?;

                let (total,): (i64,) = sqlx::query_as(
                    r#"
                    SELECT COUNT(*) FROM bookmarks
                    WHERE visibility = 'PUBLIC'
                      AND EXISTS (SELECT 1 FROM json_each(bookmarks.tags)
                                  WHERE json_each.value = ?)
                    "#,
                )
                .bind(&tag)
                .fetch_one(&self.db)
                .await?;

                (items, total)
            }
            None => {
                let items: Vec<Bookmark> = sqlx::query_as(
                    r#"
                    SELECT * FROM bookmarks
                    WHERE visibility = 'PUBLIC'
                    ORDER BY created_at DESC
                    LIMIT ? OFFSET ?
                    "#,
                )
                .bind(size)
                .bind(page * size)
                .fetch_all(&self.db)
                .await?;

                let (total,): (i64,) =
                    sqlx::query_as("SELECT COUNT(*) FROM bookmarks WHERE visibility = 'PUBLIC'")
                        .fetch_one(&self.db)
                        .await?;

                (items, total)
            }
        };

        Ok(to_list_response(items, page, size, total))
    }

    /// The caller's own bookmarks, any visibility
    pub async fn list_for_owner(
        &self,
        owner_id: Uuid,
        page: i64,
        size: i64,
    ) -> Result<BookmarkListResponse, ApiError> {
        let items: Vec<Bookmark> = sqlx::query_as(
            r#"
            SELECT * FROM bookmarks
            WHERE owner_id = ?
            ORDER BY created_at DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(owner_id)
        .bind(size)
        .bind(page * size)
        .fetch_all(&self.db)
        .await?;

        let (total,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM bookmarks WHERE owner_id = ?")
                .bind(owner_id)
                .fetch_one(&self.db)
                .await?;

        Ok(to_list_response(items, page, size, total))
    }

    /// Bookmarks the caller has saved, most recent save first
    pub async fn list_saved(
        &self,
        user_id: Uuid,
        page: i64,
        size: i64,
    ) -> Result<BookmarkListResponse, ApiError> {
        let items: Vec<Bookmark> = sqlx::query_as(
            r#"
            SELECT b.* FROM bookmarks b
            JOIN bookmark_saves s ON s.bookmark_id = b.id
            WHERE s.user_id = ?
            ORDER BY s.created_at DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(user_id)
        .bind(size)
        .bind(page * size)
        .fetch_all(&self.db)
        .await?;

        let (total,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM bookmark_saves WHERE user_id = ?")
                .bind(user_id)
                .fetch_one(&self.db)
                .await?;

        Ok(to_list_response(items, page, size, total))
    }

    /// Public bookmarks of a given handle
    pub async fn list_for_username(
        &self,
        username: &str,
        page: i64,
        size: i64,
    ) -> Result<BookmarkListResponse, ApiError> {
        let username = username.trim().to_lowercase();

        let items: Vec<Bookmark> = sqlx::query_as(
            r#"
            SELECT * FROM bookmarks
            WHERE owner_username = ? AND visibility = 'PUBLIC'
            ORDER BY created_at DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(&username)
        .bind(size)
        .bind(page * size)
        .fetch_all(&self.db)
        .await?;

        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM bookmarks WHERE owner_username = ? AND visibility = 'PUBLIC'",
        )
        .bind(&username)
        .fetch_one(&self.db)
        .await?;

        Ok(to_list_response(items, page, size, total))
    }

    // ========================================================================
    // CRUD
    // ========================================================================

    pub async fn get_by_id(
        &self,
        id: Uuid,
        caller: Option<&AuthedUser>,
    ) -> Result<BookmarkResponse, ApiError> {
        let bookmark = self.load(id).await?;
        enforce_readable(&bookmark, caller)?;
        Ok(bookmark.into())
    }

    pub async fn create(
        &self,
        caller: &AuthedUser,
        request: CreateBookmarkRequest,
    ) -> Result<BookmarkResponse, ApiError> {
        require_writer(caller)?;

        let validation = BookmarkValidator.validate(&request);
        if !validation.is_valid {
            return Err(validation.into());
        }

        let url = parse_url(&request.url)
            .ok_or_else(|| ApiError::ValidationError("url: URL must include a scheme and host".to_string()))?;
        let tags = normalize_tags(request.tags.as_deref().unwrap_or(&[]));
        let now = Utc::now();

        let bookmark = Bookmark {
            id: Uuid::new_v4(),
            owner_id: caller.id,
            owner_name: owner_display_name(caller),
            owner_username: caller.username.clone(),
            owner_avatar_url: caller.avatar_url.clone(),
            title: request.title.trim().to_string(),
            url: url.to_string(),
            description: request
                .description
                .as_deref()
                .unwrap_or("")
                .trim()
                .to_string(),
            visibility: request.visibility.unwrap_or(Visibility::Public),
            tags: tags_to_json(&tags),
            saved_count: 0,
            shared_count: 0,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO bookmarks (id, owner_id, owner_name, owner_username,
                                   owner_avatar_url, title, url, description,
                                   visibility, tags, saved_count, shared_count,
                                   created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(bookmark.id)
        .bind(bookmark.owner_id)
        .bind(&bookmark.owner_name)
        .bind(&bookmark.owner_username)
        .bind(&bookmark.owner_avatar_url)
        .bind(&bookmark.title)
        .bind(&bookmark.url)
        .bind(&bookmark.description)
        .bind(bookmark.visibility)
        .bind(&bookmark.tags)
        .bind(bookmark.saved_count)
        .bind(bookmark.shared_count)
        .bind(bookmark.created_at)
        .bind(bookmark.updated_at)
        .execute(&self.db)
        .await?;

        info!(bookmark_id = %bookmark.id, owner_id = %caller.id, "Bookmark created");

        Ok(bookmark.into())
    }

    /// Partial update; skips the write entirely when nothing changed
    pub async fn update(
        &self,
        id: Uuid,
        caller: &AuthedUser,
        request: UpdateBookmarkRequest,
    ) -> Result<BookmarkResponse, ApiError> {
        require_writer(caller)?;

        let mut bookmark = self.load(id).await?;
        enforce_owner_or_admin(&bookmark, caller)?;

        let validation = BookmarkValidator.validate(&request);
        if !validation.is_valid {
            return Err(validation.into());
        }

        let mut changed = false;

        if let Some(title) = &request.title {
            let title = title.trim().to_string();
            if title != bookmark.title {
                bookmark.title = title;
                changed = true;
            }
        }
        if let Some(url) = &request.url {
            let url = parse_url(url)
                .ok_or_else(|| ApiError::ValidationError("url: URL must include a scheme and host".to_string()))?
                .to_string();
            if url != bookmark.url {
                bookmark.url = url;
                changed = true;
            }
        }
        if let Some(description) = &request.description {
            let description = description.trim().to_string();
            if description != bookmark.description {
                bookmark.description = description;
                changed = true;
            }
        }
        if let Some(tags) = &request.tags {
            let tags = tags_to_json(&normalize_tags(tags));
            if tags != bookmark.tags {
                bookmark.tags = tags;
                changed = true;
            }
        }
        if let Some(visibility) = request.visibility {
            if visibility != bookmark.visibility {
                bookmark.visibility = visibility;
                changed = true;
            }
        }

        if changed {
            bookmark.updated_at = Utc::now();
            sqlx::query(
                r#"
                UPDATE bookmarks
                SET title = ?, url = ?, description = ?, visibility = ?,
                    tags = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&bookmark.title)
            .bind(&bookmark.url)
            .bind(&bookmark.description)
            .bind(bookmark.visibility)
            .bind(&bookmark.tags)
            .bind(bookmark.updated_at)
            .bind(bookmark.id)
            .execute(&self.db)
            .await?;

            debug!(bookmark_id = %bookmark.id, "Bookmark updated");
        }

        Ok(bookmark.into())
    }

    pub async fn delete(&self, id: Uuid, caller: &AuthedUser) -> Result<(), ApiError> {
        require_writer(caller)?;

        let bookmark = self.load(id).await?;
        enforce_owner_or_admin(&bookmark, caller)?;

        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM bookmark_saves WHERE bookmark_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM bookmark_shares WHERE bookmark_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM bookmarks WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(bookmark_id = %id, user_id = %caller.id, "Bookmark deleted");

        Ok(())
    }

    // ========================================================================
    // Toggles
    // ========================================================================

    pub async fn record_save(
        &self,
        id: Uuid,
        caller: &AuthedUser,
    ) -> Result<BookmarkResponse, ApiError> {
        self.record_interaction(id, caller, InteractionKind::Save).await
    }

    pub async fn remove_save(
        &self,
        id: Uuid,
        caller: &AuthedUser,
    ) -> Result<BookmarkResponse, ApiError> {
        self.remove_interaction(id, caller, InteractionKind::Save).await
    }

    pub async fn record_share(
        &self,
        id: Uuid,
        caller: &AuthedUser,
    ) -> Result<BookmarkResponse, ApiError> {
        self.record_interaction(id, caller, InteractionKind::Share).await
    }

    pub async fn remove_share(
        &self,
        id: Uuid,
        caller: &AuthedUser,
    ) -> Result<BookmarkResponse, ApiError> {
        self.remove_interaction(id, caller, InteractionKind::Share).await
    }

    /// Insert the interaction row and bump the counter in one transaction.
    /// `INSERT OR IGNORE` against the unique `(bookmark_id, user_id)` index
    /// makes repetition and concurrent duplicates a no-op.
    async fn record_interaction(
        &self,
        id: Uuid,
        caller: &AuthedUser,
        kind: InteractionKind,
    ) -> Result<BookmarkResponse, ApiError> {
        let mut tx = self.db.begin().await?;

        let bookmark: Bookmark = sqlx::query_as("SELECT * FROM bookmarks WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ApiError::NotFound("Bookmark not found".to_string()))?;
        enforce_readable(&bookmark, Some(caller))?;

        let insert = sqlx::query(&format!(
            "INSERT OR IGNORE INTO {} (id, bookmark_id, user_id, created_at) VALUES (?, ?, ?, ?)",
            kind.table()
        ))
        .bind(Uuid::new_v4())
        .bind(id)
        .bind(caller.id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        let inserted = insert.rows_affected() > 0;
        if inserted {
            sqlx::query(&format!(
                "UPDATE bookmarks SET {c} = {c} + 1 WHERE id = ?",
                c = kind.counter()
            ))
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        let bookmark: Bookmark = sqlx::query_as("SELECT * FROM bookmarks WHERE id = ?")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        if inserted {
            debug!(bookmark_id = %id, user_id = %caller.id, kind = ?kind, "Interaction recorded");
            match kind {
                InteractionKind::Save => {
                    self.events.bookmark_saved(id, caller.id, bookmark.saved_count)
                }
                InteractionKind::Share => {
                    self.events.bookmark_shared(id, caller.id, bookmark.shared_count)
                }
            }
        }

        Ok(bookmark.into())
    }

    /// Delete the interaction row and decrement the counter, clamped at zero
    async fn remove_interaction(
        &self,
        id: Uuid,
        caller: &AuthedUser,
        kind: InteractionKind,
    ) -> Result<BookmarkResponse, ApiError> {
        let mut tx = self.db.begin().await?;

        let bookmark: Bookmark = sqlx::query_as("SELECT * FROM bookmarks WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ApiError::NotFound("Bookmark not found".to_string()))?;
        enforce_readable(&bookmark, Some(caller))?;

        let deleted = sqlx::query(&format!(
            "DELETE FROM {} WHERE bookmark_id = ? AND user_id = ?",
            kind.table()
        ))
        .bind(id)
        .bind(caller.id)
        .execute(&mut *tx)
        .await?;

        if deleted.rows_affected() > 0 {
            sqlx::query(&format!(
                "UPDATE bookmarks SET {c} = MAX({c} - 1, 0) WHERE id = ?",
                c = kind.counter()
            ))
            .bind(id)
            .execute(&mut *tx)
            .await?;

            debug!(bookmark_id = %id, user_id = %caller.id, kind = ?kind, "Interaction removed");
        }

        let bookmark: Bookmark = sqlx::query_as("SELECT * FROM bookmarks WHERE id = ?")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(bookmark.into())
    }

    async fn load(&self, id: Uuid) -> Result<Bookmark, ApiError> {
        sqlx::query_as("SELECT * FROM bookmarks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::NotFound("Bookmark not found".to_string()))
    }
}

/// Uniform access policy: a private bookmark that exists but is not
/// accessible is always forbidden; not-found is reserved for a truly
/// absent id.
fn enforce_readable(bookmark: &Bookmark, caller: Option<&AuthedUser>) -> Result<(), ApiError> {
    if bookmark.visibility == Visibility::Private {
        let allowed = caller
            .map(|user| bookmark.owner_id == user.id || user.is_admin())
            .unwrap_or(false);
        if !allowed {
            return Err(ApiError::Forbidden("Bookmark is private".to_string()));
        }
    }
    Ok(())
}

fn enforce_owner_or_admin(bookmark: &Bookmark, caller: &AuthedUser) -> Result<(), ApiError> {
    if bookmark.owner_id != caller.id && !caller.is_admin() {
        return Err(ApiError::Forbidden("Not allowed".to_string()));
    }
    Ok(())
}

fn require_writer(caller: &AuthedUser) -> Result<(), ApiError> {
    if !caller.can_write() {
        return Err(ApiError::Forbidden("Insufficient role".to_string()));
    }
    Ok(())
}

fn owner_display_name(caller: &AuthedUser) -> String {
    let name = caller.name.trim();
    if name.is_empty() {
        "User".to_string()
    } else {
        name.to_string()
    }
}

fn to_list_response(
    items: Vec<Bookmark>,
    page: i64,
    size: i64,
    total: i64,
) -> BookmarkListResponse {
    BookmarkListResponse {
        items: items.into_iter().map(BookmarkResponse::from).collect(),
        page,
        size,
        total,
    }
}
