//! Google ID token verification against the provider's published key set

use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use moka::future::Cache;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use super::error::AuthError;
use crate::common::config::GoogleConfig;

/// How long fetched signing keys stay usable before a refetch.
/// Google rotates its keys on the order of days.
const KEY_SET_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// JSON Web Key Set as served by the provider
#[derive(Debug, Clone, Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

#[derive(Debug, Clone, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    #[serde(default)]
    n: String,
    #[serde(default)]
    e: String,
}

/// Claims carried by a Google ID token
#[derive(Debug, Deserialize)]
pub(crate) struct GoogleClaims {
    pub(crate) sub: String,
    pub(crate) email: Option<String>,
    pub(crate) email_verified: Option<bool>,
    pub(crate) name: Option<String>,
    pub(crate) picture: Option<String>,
}

/// Identity extracted from a successfully verified Google ID token
#[derive(Debug, Clone)]
pub struct VerifiedGoogleIdentity {
    pub subject: String,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
}

/// Validates Google ID tokens: RS256 signature against the published key
/// set, issuer equality, and audience when a client id is configured.
///
/// The key set is cached per kid. A cached list of known key IDs lets us
/// reject tokens referencing unknown keys without refetching, so a flood of
/// bad tokens cannot hammer the JWKS endpoint.
pub struct GoogleTokenVerifier {
    config: GoogleConfig,
    http: reqwest::Client,
    key_cache: Cache<String, Arc<DecodingKey>>,
    known_kids: Cache<&'static str, Arc<Vec<String>>>,
}

impl GoogleTokenVerifier {
    pub fn new(config: GoogleConfig, http: reqwest::Client) -> Self {
        Self {
            config,
            http,
            key_cache: Cache::builder()
                .time_to_live(KEY_SET_CACHE_TTL)
                .max_capacity(16)
                .build(),
            known_kids: Cache::builder()
                .time_to_live(KEY_SET_CACHE_TTL)
                .max_capacity(1)
                .build(),
        }
    }

    /// Verify an ID token and extract the identity claims
    pub async fn verify(&self, id_token: &str) -> Result<VerifiedGoogleIdentity, AuthError> {
        let header = decode_header(id_token).map_err(|e| {
            debug!(error = %e, "Failed to decode identity token header");
            AuthError::InvalidToken
        })?;
        let kid = header.kid.ok_or_else(|| {
            debug!("Identity token missing kid");
            AuthError::InvalidToken
        })?;

        let key = self.decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[self.config.issuer.as_str()]);
        if let Some(client_id) = &self.config.client_id {
            validation.set_audience(&[client_id.as_str()]);
        }

        let data = decode::<GoogleClaims>(id_token, &key, &validation).map_err(|e| {
            warn!(error = %e, "Identity token validation failed");
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => AuthError::IssuerMismatch,
                jsonwebtoken::errors::ErrorKind::InvalidAudience => AuthError::AudienceMismatch,
                _ => AuthError::InvalidToken,
            }
        })?;

        extract_identity(data.claims)
    }

    /// Look up the decoding key for `kid`, fetching the key set on a miss.
    ///
    /// An unknown kid after a fresh fetch is an authentication failure, not
    /// a retry loop: stale keys surface as an error rather than a hang.
    async fn decoding_key(&self, kid: &str) -> Result<Arc<DecodingKey>, AuthError> {
        if let Some(key) = self.key_cache.get(kid).await {
            return Ok(key);
        }

        if let Some(known) = self.known_kids.get("jwks").await {
            if !known.iter().any(|k| k == kid) {
                debug!(kid = %kid, "Unknown key ID not in cached key set");
                return Err(AuthError::InvalidToken);
            }
        }

        let key_set = self.fetch_key_set().await?;

        let kids: Vec<String> = key_set.keys.iter().map(|k| k.kid.clone()).collect();
        self.known_kids.insert("jwks", Arc::new(kids)).await;

        let mut found = None;
        for jwk in key_set.keys.iter().filter(|k| k.kty == "RSA") {
            match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
                Ok(decoding_key) => {
                    let decoding_key = Arc::new(decoding_key);
                    self.key_cache
                        .insert(jwk.kid.clone(), decoding_key.clone())
                        .await;
                    if jwk.kid == kid {
                        found = Some(decoding_key);
                    }
                }
                Err(e) => {
                    warn!(kid = %jwk.kid, error = %e, "Skipping unusable key in key set");
                }
            }
        }

        found.ok_or_else(|| {
            debug!(kid = %kid, "Key ID not present in fetched key set");
            AuthError::InvalidToken
        })
    }

    async fn fetch_key_set(&self) -> Result<JwkSet, AuthError> {
        debug!(uri = %self.config.jwk_set_uri, "Fetching identity provider key set");

        let response = self
            .http
            .get(&self.config.jwk_set_uri)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch identity provider key set");
                AuthError::KeySetUnavailable(e.to_string())
            })?;

        if !response.status().is_success() {
            error!(http_status = %response.status(), "Key set endpoint returned error status");
            return Err(AuthError::KeySetUnavailable(format!(
                "status {}",
                response.status()
            )));
        }

        response.json::<JwkSet>().await.map_err(|e| {
            error!(error = %e, "Failed to parse identity provider key set");
            AuthError::KeySetUnavailable(e.to_string())
        })
    }
}

/// Apply the claim-level rules after signature/issuer/audience checks:
/// unverified or missing email rejects the token, a missing name gets a
/// placeholder.
pub(crate) fn extract_identity(
    claims: GoogleClaims,
) -> Result<VerifiedGoogleIdentity, AuthError> {
    if claims.email_verified == Some(false) {
        return Err(AuthError::UnverifiedEmail);
    }

    let email = claims
        .email
        .filter(|e| !e.trim().is_empty())
        .ok_or(AuthError::MissingEmail)?;

    let name = claims
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| "Google User".to_string());

    Ok(VerifiedGoogleIdentity {
        subject: claims.sub,
        email,
        name,
        picture: claims.picture,
    })
}
