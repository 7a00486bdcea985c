// Authentication error types

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid token")]
    InvalidToken,

    #[error("token expired")]
    TokenExpired,

    #[error("token issuer mismatch")]
    IssuerMismatch,

    #[error("token audience mismatch")]
    AudienceMismatch,

    #[error("identity token missing email")]
    MissingEmail,

    #[error("account email is not verified")]
    UnverifiedEmail,

    #[error("invalid token subject")]
    InvalidSubject,

    #[error("signing key set unavailable: {0}")]
    KeySetUnavailable(String),

    #[error("token creation failed: {0}")]
    TokenCreation(String),
}
