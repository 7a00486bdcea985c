//! Tests for bookmarks module
//!
//! Validator rules run as plain unit tests; authorization, partial update,
//! and toggle semantics run against an in-memory SQLite store.

#[cfg(test)]
mod tests {
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;
    use uuid::Uuid;

    use crate::auth::{AuthedUser, Role};
    use crate::bookmarks::models::{
        CreateBookmarkRequest, UpdateBookmarkRequest, Visibility,
    };
    use crate::bookmarks::service::BookmarksService;
    use crate::bookmarks::validators::{normalize_tags, parse_url, BookmarkValidator};
    use crate::common::migrations::run_migrations;
    use crate::common::{ApiError, Validator};
    use crate::services::EventPublisher;

    // ------------------------------------------------------------------
    // Validators
    // ------------------------------------------------------------------

    fn create_request() -> CreateBookmarkRequest {
        CreateBookmarkRequest {
            title: "Rust async book".to_string(),
            url: "https://rust-lang.github.io/async-book/".to_string(),
            description: Some("Worth rereading".to_string()),
            tags: Some(vec!["Rust".to_string(), "async".to_string()]),
            visibility: None,
        }
    }

    #[test]
    fn create_validator_accepts_valid_request() {
        let result = BookmarkValidator.validate(&create_request());
        assert!(result.is_valid);
    }

    #[test]
    fn create_validator_rejects_blank_title() {
        let request = CreateBookmarkRequest {
            title: "   ".to_string(),
            ..create_request()
        };
        let result = BookmarkValidator.validate(&request);
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.field == "title"));
    }

    #[test]
    fn create_validator_rejects_url_without_host() {
        for bad in ["not a url", "mailto:user@ex.com", "/relative/path"] {
            let request = CreateBookmarkRequest {
                url: bad.to_string(),
                ..create_request()
            };
            let result = BookmarkValidator.validate(&request);
            assert!(!result.is_valid, "expected rejection for {:?}", bad);
            assert!(result.errors.iter().any(|e| e.field == "url"));
        }
    }

    #[test]
    fn update_validator_ignores_absent_fields() {
        let request = UpdateBookmarkRequest {
            title: None,
            url: None,
            description: None,
            tags: None,
            visibility: None,
        };
        assert!(BookmarkValidator.validate(&request).is_valid);
    }

    #[test]
    fn update_validator_rejects_blank_title_when_supplied() {
        let request = UpdateBookmarkRequest {
            title: Some("".to_string()),
            url: None,
            description: None,
            tags: None,
            visibility: None,
        };
        let result = BookmarkValidator.validate(&request);
        assert!(!result.is_valid);
    }

    #[test]
    fn parse_url_requires_scheme_and_host() {
        assert!(parse_url("https://example.com/a?b=c").is_some());
        assert!(parse_url("  http://example.com  ").is_some());
        assert!(parse_url("example.com/path").is_none());
        assert!(parse_url("mailto:user@ex.com").is_none());
    }

    #[test]
    fn normalize_tags_lowercases_and_dedupes() {
        let tags = vec![
            "Rust ".to_string(),
            "rust".to_string(),
            "".to_string(),
            "  ".to_string(),
            "DB".to_string(),
        ];
        assert_eq!(normalize_tags(&tags), vec!["rust", "db"]);
    }

    // ------------------------------------------------------------------
    // Service behavior against an in-memory store
    // ------------------------------------------------------------------

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    fn service(pool: SqlitePool) -> BookmarksService {
        BookmarksService::new(pool, EventPublisher::start())
    }

    fn caller(role: Role) -> AuthedUser {
        AuthedUser {
            id: Uuid::new_v4(),
            email: "caller@ex.com".to_string(),
            name: "Caller".to_string(),
            username: "caller".to_string(),
            avatar_url: None,
            role,
        }
    }

    fn owner() -> AuthedUser {
        AuthedUser {
            id: Uuid::new_v4(),
            email: "owner@ex.com".to_string(),
            name: "Owner".to_string(),
            username: "owner".to_string(),
            avatar_url: Some("https://ex.com/owner.png".to_string()),
            role: Role::User,
        }
    }

    fn request(visibility: Visibility) -> CreateBookmarkRequest {
        CreateBookmarkRequest {
            title: "Title".to_string(),
            url: "https://example.com/".to_string(),
            description: None,
            tags: Some(vec!["Rust".to_string(), "rust".to_string(), "DB".to_string()]),
            visibility: Some(visibility),
        }
    }

    #[tokio::test]
    async fn create_snapshots_owner_and_normalizes_tags() {
        let pool = test_pool().await;
        let service = service(pool);
        let owner = owner();

        let bookmark = service
            .create(&owner, request(Visibility::Public))
            .await
            .unwrap();

        assert_eq!(bookmark.owner.id, owner.id);
        assert_eq!(bookmark.owner.name, "Owner");
        assert_eq!(bookmark.owner.username, "owner");
        assert_eq!(bookmark.tags, vec!["rust", "db"]);
        assert_eq!(bookmark.visibility, Visibility::Public);
        assert_eq!(bookmark.saved_count, 0);
        assert_eq!(bookmark.shared_count, 0);
    }

    #[tokio::test]
    async fn create_rejects_invalid_input() {
        let pool = test_pool().await;
        let service = service(pool);
        let owner = owner();

        let bad_title = CreateBookmarkRequest {
            title: " ".to_string(),
            ..request(Visibility::Public)
        };
        assert!(matches!(
            service.create(&owner, bad_title).await,
            Err(ApiError::ValidationError(_))
        ));

        let bad_url = CreateBookmarkRequest {
            url: "nope".to_string(),
            ..request(Visibility::Public)
        };
        assert!(matches!(
            service.create(&owner, bad_url).await,
            Err(ApiError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn private_bookmark_visibility_matrix() {
        let pool = test_pool().await;
        let service = service(pool);
        let owner = owner();

        let bookmark = service
            .create(&owner, request(Visibility::Private))
            .await
            .unwrap();

        // anonymous caller
        assert!(matches!(
            service.get_by_id(bookmark.id, None).await,
            Err(ApiError::Forbidden(_))
        ));

        // authenticated non-owner, non-admin
        let stranger = caller(Role::User);
        assert!(matches!(
            service.get_by_id(bookmark.id, Some(&stranger)).await,
            Err(ApiError::Forbidden(_))
        ));

        // owner and admin
        assert!(service.get_by_id(bookmark.id, Some(&owner)).await.is_ok());
        let admin = caller(Role::Admin);
        assert!(service.get_by_id(bookmark.id, Some(&admin)).await.is_ok());
    }

    #[tokio::test]
    async fn missing_bookmark_is_not_found() {
        let pool = test_pool().await;
        let service = service(pool);

        assert!(matches!(
            service.get_by_id(Uuid::new_v4(), None).await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn partial_update_touches_only_supplied_fields() {
        let pool = test_pool().await;
        let service = service(pool);
        let owner = owner();

        let created = service
            .create(
                &owner,
                CreateBookmarkRequest {
                    description: Some("keep me".to_string()),
                    ..request(Visibility::Public)
                },
            )
            .await
            .unwrap();

        let updated = service
            .update(
                created.id,
                &owner,
                UpdateBookmarkRequest {
                    title: Some("New title".to_string()),
                    url: None,
                    description: None,
                    tags: None,
                    visibility: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "New title");
        assert_eq!(updated.url, created.url);
        assert_eq!(updated.description, "keep me");
        assert_eq!(updated.tags, created.tags);
    }

    #[tokio::test]
    async fn update_with_no_changes_skips_the_write() {
        let pool = test_pool().await;
        let service = service(pool);
        let owner = owner();

        let created = service
            .create(&owner, request(Visibility::Public))
            .await
            .unwrap();
        let before = service
            .get_by_id(created.id, Some(&owner))
            .await
            .unwrap();

        let updated = service
            .update(
                created.id,
                &owner,
                UpdateBookmarkRequest {
                    title: Some(created.title.clone()),
                    url: None,
                    description: None,
                    tags: None,
                    visibility: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.updated_at, before.updated_at);
    }

    #[tokio::test]
    async fn non_owner_cannot_mutate_but_admin_can() {
        let pool = test_pool().await;
        let service = service(pool);
        let owner = owner();

        let bookmark = service
            .create(&owner, request(Visibility::Public))
            .await
            .unwrap();

        let stranger = caller(Role::User);
        let update = UpdateBookmarkRequest {
            title: Some("Hijacked".to_string()),
            url: None,
            description: None,
            tags: None,
            visibility: None,
        };
        assert!(matches!(
            service.update(bookmark.id, &stranger, update).await,
            Err(ApiError::Forbidden(_))
        ));
        assert!(matches!(
            service.delete(bookmark.id, &stranger).await,
            Err(ApiError::Forbidden(_))
        ));

        let admin = caller(Role::Admin);
        let admin_update = UpdateBookmarkRequest {
            title: Some("Moderated".to_string()),
            url: None,
            description: None,
            tags: None,
            visibility: None,
        };
        let updated = service
            .update(bookmark.id, &admin, admin_update)
            .await
            .unwrap();
        assert_eq!(updated.title, "Moderated");

        service.delete(bookmark.id, &admin).await.unwrap();
        assert!(matches!(
            service.get_by_id(bookmark.id, Some(&admin)).await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn save_toggle_is_idempotent() {
        let pool = test_pool().await;
        let service = service(pool.clone());
        let owner = owner();
        let saver = caller(Role::User);

        let bookmark = service
            .create(&owner, request(Visibility::Public))
            .await
            .unwrap();

        let first = service.record_save(bookmark.id, &saver).await.unwrap();
        assert_eq!(first.saved_count, 1);

        let second = service.record_save(bookmark.id, &saver).await.unwrap();
        assert_eq!(second.saved_count, 1);

        let (rows,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM bookmark_saves WHERE bookmark_id = ?")
                .bind(bookmark.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn remove_save_without_record_is_a_noop() {
        let pool = test_pool().await;
        let service = service(pool);
        let owner = owner();
        let saver = caller(Role::User);

        let bookmark = service
            .create(&owner, request(Visibility::Public))
            .await
            .unwrap();

        let result = service.remove_save(bookmark.id, &saver).await.unwrap();
        assert_eq!(result.saved_count, 0);
    }

    #[tokio::test]
    async fn save_then_remove_returns_counter_to_zero() {
        let pool = test_pool().await;
        let service = service(pool);
        let owner = owner();
        let saver = caller(Role::User);

        let bookmark = service
            .create(&owner, request(Visibility::Public))
            .await
            .unwrap();

        service.record_save(bookmark.id, &saver).await.unwrap();
        let removed = service.remove_save(bookmark.id, &saver).await.unwrap();
        assert_eq!(removed.saved_count, 0);

        // removing again stays at zero
        let again = service.remove_save(bookmark.id, &saver).await.unwrap();
        assert_eq!(again.saved_count, 0);
    }

    #[tokio::test]
    async fn share_toggle_mirrors_save_semantics() {
        let pool = test_pool().await;
        let service = service(pool);
        let owner = owner();
        let sharer = caller(Role::User);

        let bookmark = service
            .create(&owner, request(Visibility::Public))
            .await
            .unwrap();

        service.record_share(bookmark.id, &sharer).await.unwrap();
        let second = service.record_share(bookmark.id, &sharer).await.unwrap();
        assert_eq!(second.shared_count, 1);

        let removed = service.remove_share(bookmark.id, &sharer).await.unwrap();
        assert_eq!(removed.shared_count, 0);
    }

    #[tokio::test]
    async fn private_bookmark_cannot_be_saved_by_stranger() {
        let pool = test_pool().await;
        let service = service(pool);
        let owner = owner();
        let stranger = caller(Role::User);

        let bookmark = service
            .create(&owner, request(Visibility::Private))
            .await
            .unwrap();

        assert!(matches!(
            service.record_save(bookmark.id, &stranger).await,
            Err(ApiError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn public_listing_excludes_private_and_filters_by_tag() {
        let pool = test_pool().await;
        let service = service(pool);
        let owner = owner();

        let public = service
            .create(&owner, request(Visibility::Public))
            .await
            .unwrap();
        service
            .create(&owner, request(Visibility::Private))
            .await
            .unwrap();

        let all = service.list_public(0, 20, None).await.unwrap();
        assert_eq!(all.total, 1);
        assert_eq!(all.items[0].id, public.id);

        let tagged = service.list_public(0, 20, Some("Rust")).await.unwrap();
        assert_eq!(tagged.total, 1);

        let none = service.list_public(0, 20, Some("cooking")).await.unwrap();
        assert_eq!(none.total, 0);
    }

    #[tokio::test]
    async fn saved_listing_returns_saved_bookmarks() {
        let pool = test_pool().await;
        let service = service(pool);
        let owner = owner();
        let saver = caller(Role::User);

        let bookmark = service
            .create(&owner, request(Visibility::Public))
            .await
            .unwrap();
        service.record_save(bookmark.id, &saver).await.unwrap();

        let saved = service.list_saved(saver.id, 0, 20).await.unwrap();
        assert_eq!(saved.total, 1);
        assert_eq!(saved.items[0].id, bookmark.id);

        let empty = service.list_saved(owner.id, 0, 20).await.unwrap();
        assert_eq!(empty.total, 0);
    }

    #[tokio::test]
    async fn username_listing_returns_only_public_bookmarks() {
        let pool = test_pool().await;
        let service = service(pool);
        let owner = owner();

        service
            .create(&owner, request(Visibility::Public))
            .await
            .unwrap();
        service
            .create(&owner, request(Visibility::Private))
            .await
            .unwrap();

        let listed = service.list_for_username("OWNER", 0, 20).await.unwrap();
        assert_eq!(listed.total, 1);
    }
}
