//! User profile reads and partial updates

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use super::models::{UpdateProfileRequest, UserProfileResponse};
use super::validators::ProfileValidator;
use crate::auth::User;
use crate::common::username::{self, TxUsernameStore};
use crate::common::{ApiError, Validator};

pub struct UsersService {
    db: SqlitePool,
}

impl UsersService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn get_profile(&self, id: Uuid) -> Result<UserProfileResponse, ApiError> {
        let user: User = sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        Ok(user.into())
    }

    /// Partial update of the caller's own profile. A username change goes
    /// through the shared resolver, probing and writing inside the same
    /// transaction; no write happens when nothing changed.
    pub async fn update_profile(
        &self,
        id: Uuid,
        request: UpdateProfileRequest,
    ) -> Result<UserProfileResponse, ApiError> {
        let validation = ProfileValidator.validate(&request);
        if !validation.is_valid {
            return Err(validation.into());
        }

        let mut tx = self.db.begin().await?;

        let mut user: User = sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        let mut changed = false;

        if let Some(name) = &request.name {
            let name = name.trim();
            if !name.is_empty() && name != user.name {
                user.name = name.to_string();
                changed = true;
            }
        }

        if let Some(requested) = &request.username {
            if !requested.trim().is_empty() && requested.trim() != user.username {
                let base = username::normalize(requested);
                if base.is_empty() {
                    return Err(ApiError::ValidationError(
                        "username: Username must contain letters or digits".to_string(),
                    ));
                }
                let resolved = {
                    let mut store = TxUsernameStore { tx: &mut tx };
                    username::resolve_unique(&mut store, &base, Some(user.id)).await?
                };
                if resolved != user.username {
                    user.username = resolved;
                    changed = true;
                }
            }
        }

        if let Some(bio) = &request.bio {
            let bio = Some(bio.trim().to_string());
            if bio != user.bio {
                user.bio = bio;
                changed = true;
            }
        }

        if let Some(avatar_url) = &request.avatar_url {
            let avatar_url = Some(avatar_url.trim().to_string());
            if avatar_url != user.avatar_url {
                user.avatar_url = avatar_url;
                changed = true;
            }
        }

        if changed {
            user.updated_at = Utc::now();
            sqlx::query(
                r#"
                UPDATE users
                SET name = ?, username = ?, bio = ?, avatar_url = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&user.name)
            .bind(&user.username)
            .bind(&user.bio)
            .bind(&user.avatar_url)
            .bind(user.updated_at)
            .bind(user.id)
            .execute(&mut *tx)
            .await?;

            info!(user_id = %user.id, "Profile updated");
        } else {
            debug!(user_id = %user.id, "Profile update carried no changes");
        }

        tx.commit().await?;

        Ok(user.into())
    }
}
