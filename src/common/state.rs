// Application state shared across all modules

use sqlx::SqlitePool;
use std::sync::Arc;

use super::config::AppConfig;
use crate::auth::{GoogleTokenVerifier, SessionTokenService};
use crate::services::EventPublisher;

/// Application state containing the database pool, token services, and
/// configuration
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub google_verifier: Arc<GoogleTokenVerifier>,
    pub session_tokens: Arc<SessionTokenService>,
    pub events: EventPublisher,
}
