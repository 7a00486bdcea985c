//! Tests for users module

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;
    use uuid::Uuid;

    use crate::common::migrations::run_migrations;
    use crate::common::ApiError;
    use crate::users::models::UpdateProfileRequest;
    use crate::users::service::UsersService;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    async fn insert_user(pool: &SqlitePool, username: &str, email: &str) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO users (id, provider, provider_id, email, name, username,
                               bio, avatar_url, role, created_at, updated_at)
            VALUES (?, 'google', ?, ?, 'Test User', ?, NULL, NULL, 'USER', ?, ?)
            "#,
        )
        .bind(id)
        .bind(id.to_string())
        .bind(email)
        .bind(username)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .unwrap();
        id
    }

    fn no_changes() -> UpdateProfileRequest {
        UpdateProfileRequest {
            name: None,
            username: None,
            bio: None,
            avatar_url: None,
        }
    }

    #[tokio::test]
    async fn get_profile_returns_stored_account() {
        let pool = test_pool().await;
        let id = insert_user(&pool, "ann", "a@ex.com").await;
        let service = UsersService::new(pool);

        let profile = service.get_profile(id).await.unwrap();
        assert_eq!(profile.id, id);
        assert_eq!(profile.username, "ann");
        assert_eq!(profile.email, "a@ex.com");
    }

    #[tokio::test]
    async fn get_profile_for_unknown_id_is_not_found() {
        let pool = test_pool().await;
        let service = UsersService::new(pool);

        assert!(matches!(
            service.get_profile(Uuid::new_v4()).await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn update_applies_only_supplied_fields() {
        let pool = test_pool().await;
        let id = insert_user(&pool, "ann", "a@ex.com").await;
        let service = UsersService::new(pool);

        let profile = service
            .update_profile(
                id,
                UpdateProfileRequest {
                    bio: Some("Collects links".to_string()),
                    ..no_changes()
                },
            )
            .await
            .unwrap();

        assert_eq!(profile.bio.as_deref(), Some("Collects links"));
        assert_eq!(profile.name, "Test User");
        assert_eq!(profile.username, "ann");
    }

    #[tokio::test]
    async fn update_renames_username_through_the_resolver() {
        let pool = test_pool().await;
        insert_user(&pool, "taken", "t@ex.com").await;
        let id = insert_user(&pool, "ann", "a@ex.com").await;
        let service = UsersService::new(pool);

        // requested handle collides, resolver appends a suffix
        let profile = service
            .update_profile(
                id,
                UpdateProfileRequest {
                    username: Some("Taken!".to_string()),
                    ..no_changes()
                },
            )
            .await
            .unwrap();
        assert_eq!(profile.username, "taken1");

        // renaming to your own current handle is a no-op
        let same = service
            .update_profile(
                id,
                UpdateProfileRequest {
                    username: Some("taken1".to_string()),
                    ..no_changes()
                },
            )
            .await
            .unwrap();
        assert_eq!(same.username, "taken1");
    }

    #[tokio::test]
    async fn update_rejects_username_without_letters_or_digits() {
        let pool = test_pool().await;
        let id = insert_user(&pool, "ann", "a@ex.com").await;
        let service = UsersService::new(pool);

        assert!(matches!(
            service
                .update_profile(
                    id,
                    UpdateProfileRequest {
                        username: Some("!!!".to_string()),
                        ..no_changes()
                    },
                )
                .await,
            Err(ApiError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn update_with_no_changes_skips_the_write() {
        let pool = test_pool().await;
        let id = insert_user(&pool, "ann", "a@ex.com").await;
        let service = UsersService::new(pool);

        let before = service.get_profile(id).await.unwrap();
        let after = service.update_profile(id, no_changes()).await.unwrap();

        assert_eq!(after.updated_at, before.updated_at);
    }

    #[tokio::test]
    async fn update_rejects_oversize_bio() {
        let pool = test_pool().await;
        let id = insert_user(&pool, "ann", "a@ex.com").await;
        let service = UsersService::new(pool);

        assert!(matches!(
            service
                .update_profile(
                    id,
                    UpdateProfileRequest {
                        bio: Some("x".repeat(281)),
                        ..no_changes()
                    },
                )
                .await,
            Err(ApiError::ValidationError(_))
        ));
    }
}
