//! Authentication extractors for Axum

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use super::error::AuthError;
use super::models::{Role, SessionClaims};
use crate::common::{safe_email_log, ApiError, AppState};

/// Authenticated caller, built from verified session token claims only.
/// No session store, no database lookup: every service authenticates
/// independently from the token itself.
#[derive(Debug, Clone)]
pub struct AuthedUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub username: String,
    pub avatar_url: Option<String>,
    pub role: Role,
}

impl AuthedUser {
    /// A malformed subject is a protocol violation and rejects the token
    pub fn from_claims(claims: SessionClaims) -> Result<Self, AuthError> {
        let id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidSubject)?;
        Ok(Self {
            id,
            email: claims.email,
            name: claims.name,
            username: claims.username,
            avatar_url: claims.avatar_url,
            role: Role::from_roles_claim(&claims.roles),
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn can_write(&self) -> bool {
        self.role.can_write()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(state_lock): Extension<Arc<RwLock<AppState>>> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;

        let app_state = state_lock.read().await.clone();

        let token = match bearer_token(parts) {
            Some(t) => t,
            None => {
                warn!("Authentication failed: missing Authorization header");
                return Err(ApiError::Unauthorized("missing auth".into()));
            }
        };

        let claims = app_state.session_tokens.verify(&token)?;
        let authed = AuthedUser::from_claims(claims)?;

        debug!(
            user_id = %authed.id,
            email = %safe_email_log(&authed.email),
            role = %authed.role.as_str(),
            "User authentication successful via extractor"
        );

        Ok(authed)
    }
}

/// Optional authentication for endpoints that serve anonymous callers too.
/// A missing Authorization header yields `None`; a present but invalid
/// token is still rejected.
#[derive(Debug)]
pub struct OptionalAuthedUser(pub Option<AuthedUser>);

#[async_trait]
impl<S> FromRequestParts<S> for OptionalAuthedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if parts.headers.get(AUTHORIZATION).is_none() {
            return Ok(OptionalAuthedUser(None));
        }
        let authed = AuthedUser::from_request_parts(parts, state).await?;
        Ok(OptionalAuthedUser(Some(authed)))
    }
}

/// Handle "Bearer <token>" format or a raw token
fn bearer_token(parts: &Parts) -> Option<String> {
    let header = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    match header.strip_prefix("Bearer ") {
        Some(rest) => Some(rest.to_string()),
        None => Some(header.to_string()),
    }
}
