// Application configuration resolved once at startup

use anyhow::{ensure, Context};
use std::env;

/// Session token settings shared by the issuer and every verifier
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub expiration_seconds: i64,
}

/// Google identity federation settings
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// When unset, audience enforcement is skipped (open deployments)
    pub client_id: Option<String>,
    pub issuer: String,
    pub jwk_set_uri: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub cors_origins: String,
    pub jwt: JwtConfig,
    pub google: GoogleConfig,
}

impl AppConfig {
    /// Load configuration from the environment.
    ///
    /// A missing or short JWT secret is a deployment misconfiguration and
    /// aborts startup here, before any request is served.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://bookmarks_api.db".to_string());

        let secret = env::var("JWT_SECRET").context("JWT_SECRET must be configured")?;
        ensure!(
            secret.as_bytes().len() >= 32,
            "JWT_SECRET must be at least 32 bytes"
        );

        let issuer = env::var("JWT_ISSUER").unwrap_or_else(|_| "bookmarks-auth".to_string());
        let expiration_seconds = env::var("JWT_EXPIRATION_SECONDS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(3600);
        ensure!(
            expiration_seconds > 0,
            "JWT_EXPIRATION_SECONDS must be positive"
        );

        let google = GoogleConfig {
            client_id: env::var("GOOGLE_CLIENT_ID").ok().filter(|v| !v.is_empty()),
            issuer: env::var("GOOGLE_ISSUER")
                .unwrap_or_else(|_| "https://accounts.google.com".to_string()),
            jwk_set_uri: env::var("GOOGLE_JWK_SET_URI")
                .unwrap_or_else(|_| "https://www.googleapis.com/oauth2/v3/certs".to_string()),
        };

        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(8080);

        let cors_origins = env::var("CORS_ORIGINS").unwrap_or_else(|_| {
            "http://localhost:3000,http://localhost:5173".to_string()
        });

        Ok(Self {
            database_url,
            port,
            cors_origins,
            jwt: JwtConfig {
                secret,
                issuer,
                expiration_seconds,
            },
            google,
        })
    }
}
