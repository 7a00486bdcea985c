// src/common/migrations.rs
//! Database schema bootstrap

use sqlx::SqlitePool;
use tracing::info;

/// Create all tables and indexes if they do not exist yet
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    create_user_tables(pool).await?;
    create_bookmark_tables(pool).await?;
    create_indexes(pool).await?;

    info!("Database migration completed");

    Ok(())
}

async fn create_user_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id BLOB PRIMARY KEY,
            provider TEXT NOT NULL,
            provider_id TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            username TEXT NOT NULL UNIQUE,
            bio TEXT,
            avatar_url TEXT,
            role TEXT NOT NULL DEFAULT 'USER',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (provider, provider_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_bookmark_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bookmarks (
            id BLOB PRIMARY KEY,
            owner_id BLOB NOT NULL,
            owner_name TEXT NOT NULL,
            owner_username TEXT NOT NULL,
            owner_avatar_url TEXT,
            title TEXT NOT NULL,
            url TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            visibility TEXT NOT NULL DEFAULT 'PUBLIC',
            tags TEXT NOT NULL DEFAULT '[]',
            saved_count INTEGER NOT NULL DEFAULT 0,
            shared_count INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // one interaction row per (bookmark, user) keeps the toggles idempotent
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bookmark_saves (
            id BLOB PRIMARY KEY,
            bookmark_id BLOB NOT NULL,
            user_id BLOB NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (bookmark_id, user_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bookmark_shares (
            id BLOB PRIMARY KEY,
            bookmark_id BLOB NOT NULL,
            user_id BLOB NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (bookmark_id, user_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_indexes(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let indexes = vec![
        "CREATE INDEX IF NOT EXISTS idx_bookmarks_visibility_created ON bookmarks (visibility, created_at DESC)",
        "CREATE INDEX IF NOT EXISTS idx_bookmarks_owner ON bookmarks (owner_id, created_at DESC)",
        "CREATE INDEX IF NOT EXISTS idx_bookmarks_owner_username ON bookmarks (owner_username)",
        "CREATE INDEX IF NOT EXISTS idx_bookmark_saves_user ON bookmark_saves (user_id, created_at DESC)",
        "CREATE INDEX IF NOT EXISTS idx_bookmark_shares_user ON bookmark_shares (user_id)",
    ];

    for index_sql in indexes {
        sqlx::query(index_sql).execute(pool).await?;
    }

    Ok(())
}
