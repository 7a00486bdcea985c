//! Session token issuance and verification
//!
//! Tokens are self-contained: every service validates them against the
//! shared symmetric secret without a session store or any external call.

use anyhow::ensure;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::warn;

use super::error::AuthError;
use super::models::{SessionClaims, User};
use crate::common::config::JwtConfig;

pub struct SessionTokenService {
    issuer: String,
    expiration_seconds: i64,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl SessionTokenService {
    /// Build the service from configuration. A missing or short secret is a
    /// deployment misconfiguration and fails here, at startup.
    pub fn new(config: &JwtConfig) -> anyhow::Result<Self> {
        ensure!(
            config.secret.as_bytes().len() >= 32,
            "session token secret must be at least 32 bytes"
        );
        Ok(Self {
            issuer: config.issuer.clone(),
            expiration_seconds: config.expiration_seconds,
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
        })
    }

    /// Mint a session token for an account, returning the token and its
    /// lifetime in seconds
    pub fn issue(&self, user: &User) -> Result<(String, i64), AuthError> {
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            iss: self.issuer.clone(),
            sub: user.id.to_string(),
            iat: now,
            exp: now + self.expiration_seconds,
            email: user.email.clone(),
            name: user.name.clone(),
            username: user.username.clone(),
            avatar_url: user.avatar_url.clone(),
            roles: vec![user.role.as_str().to_string()],
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenCreation(e.to_string()))?;

        Ok((token, self.expiration_seconds))
    }

    /// Validate signature and issuer, returning the structured claims
    pub fn verify(&self, token: &str) -> Result<SessionClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.as_str()]);

        let data =
            decode::<SessionClaims>(token, &self.decoding_key, &validation).map_err(|e| {
                warn!(error = %e, "Session token validation failed");
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                    jsonwebtoken::errors::ErrorKind::InvalidIssuer => AuthError::IssuerMismatch,
                    _ => AuthError::InvalidToken,
                }
            })?;

        Ok(data.claims)
    }
}
