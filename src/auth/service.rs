//! Google sign-in: verification, account reconciliation, token issuance

use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::google::{GoogleTokenVerifier, VerifiedGoogleIdentity};
use super::models::{AuthResponse, GoogleAuthRequest, Role, User, UserSummary};
use super::token::SessionTokenService;
use crate::common::username::{self, TxUsernameStore};
use crate::common::{safe_email_log, ApiError};

const PROVIDER_GOOGLE: &str = "google";

pub struct AuthService {
    db: SqlitePool,
    google: Arc<GoogleTokenVerifier>,
    tokens: Arc<SessionTokenService>,
}

impl AuthService {
    pub fn new(
        db: SqlitePool,
        google: Arc<GoogleTokenVerifier>,
        tokens: Arc<SessionTokenService>,
    ) -> Self {
        Self { db, google, tokens }
    }

    /// Full sign-in flow: verify the identity token, map it onto a local
    /// account, and mint a session token for that account.
    pub async fn authenticate_with_google(
        &self,
        request: GoogleAuthRequest,
    ) -> Result<AuthResponse, ApiError> {
        let identity = self.google.verify(&request.id_token).await?;

        debug!(
            provider = PROVIDER_GOOGLE,
            provider_id = %identity.subject,
            email = %safe_email_log(&identity.email),
            "Identity token verified, reconciling account"
        );

        let user = self
            .reconcile(&identity, request.username.as_deref())
            .await?;

        let (token, expires_in) = self.tokens.issue(&user)?;

        info!(
            user_id = %user.id,
            email = %safe_email_log(&user.email),
            provider = PROVIDER_GOOGLE,
            "User authentication successful"
        );

        Ok(AuthResponse {
            access_token: token,
            token_type: "Bearer".to_string(),
            expires_in,
            user: UserSummary::from(&user),
        })
    }

    /// Map a verified external identity onto a local account, creating or
    /// refreshing it. Lookup, username probing, and the eventual write all
    /// run in one transaction so concurrent sign-ins cannot race each other
    /// into duplicate handles.
    pub async fn reconcile(
        &self,
        identity: &VerifiedGoogleIdentity,
        requested_username: Option<&str>,
    ) -> Result<User, ApiError> {
        let mut tx = self.db.begin().await?;

        let existing: Option<User> = sqlx::query_as(
            "SELECT * FROM users WHERE provider = ? AND provider_id = ?",
        )
        .bind(PROVIDER_GOOGLE)
        .bind(&identity.subject)
        .fetch_optional(&mut *tx)
        .await?;

        let existing = match existing {
            Some(user) => Some(user),
            None => {
                sqlx::query_as("SELECT * FROM users WHERE email = ?")
                    .bind(&identity.email)
                    .fetch_optional(&mut *tx)
                    .await?
            }
        };

        let user = match existing {
            Some(mut user) => {
                let mut changed = false;

                if user.provider != PROVIDER_GOOGLE {
                    user.provider = PROVIDER_GOOGLE.to_string();
                    changed = true;
                }
                if user.provider_id.is_empty() {
                    user.provider_id = identity.subject.clone();
                    changed = true;
                }
                if identity.name != user.name {
                    user.name = identity.name.clone();
                    changed = true;
                }
                if identity.email != user.email {
                    user.email = identity.email.clone();
                    changed = true;
                }
                if identity.picture.is_some() && identity.picture != user.avatar_url {
                    user.avatar_url = identity.picture.clone();
                    changed = true;
                }

                if let Some(requested) = requested_username {
                    if !requested.trim().is_empty() && requested != user.username {
                        let base = username::normalize(requested);
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

                if changed {
                    user.updated_at = Utc::now();
                    sqlx::query(
                        r#"
                        UPDATE users
                        SET provider = ?, provider_id = ?, email = ?, name = ?,
                            username = ?, avatar_url = ?, updated_at = ?
                        WHERE id = ?
                        "#,
                    )
                    .bind(&user.provider)
                    .bind(&user.provider_id)
                    .bind(&user.email)
                    .bind(&user.name)
                    .bind(&user.username)
                    .bind(&user.avatar_url)
                    .bind(user.updated_at)
                    .bind(user.id)
                    .execute(&mut *tx)
                    .await?;

                    debug!(user_id = %user.id, "Refreshed account from verified identity");
                }

                user
            }
            None => {
                let base = match requested_username {
                    Some(requested) if !requested.trim().is_empty() => {
                        username::normalize(requested)
                    }
                    _ => username::normalize(email_local_part(&identity.email)),
                };

                let handle = {
                    let mut store = TxUsernameStore { tx: &mut tx };
                    username::resolve_unique(&mut store, &base, None).await?
                };

                let now = Utc::now();
                let user = User {
                    id: Uuid::new_v4(),
                    provider: PROVIDER_GOOGLE.to_string(),
                    provider_id: identity.subject.clone(),
                    email: identity.email.clone(),
                    name: identity.name.clone(),
                    username: handle,
                    bio: None,
                    avatar_url: identity.picture.clone(),
                    role: Role::User,
                    created_at: now,
                    updated_at: now,
                };

                sqlx::query(
                    r#"
                    INSERT INTO users (id, provider, provider_id, email, name, username,
                                       bio, avatar_url, role, created_at, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(user.id)
                .bind(&user.provider)
                .bind(&user.provider_id)
                .bind(&user.email)
                .bind(&user.name)
                .bind(&user.username)
                .bind(&user.bio)
                .bind(&user.avatar_url)
                .bind(user.role)
                .bind(user.created_at)
                .bind(user.updated_at)
                .execute(&mut *tx)
                .await?;

                info!(
                    user_id = %user.id,
                    email = %safe_email_log(&user.email),
                    username = %user.username,
                    "Created new account via Google sign-in"
                );

                user
            }
        };

        tx.commit().await?;

        Ok(user)
    }
}

fn email_local_part(email: &str) -> &str {
    match email.find('@') {
        Some(at) if at > 0 => &email[..at],
        _ => email,
    }
}
