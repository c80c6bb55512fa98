//! Error taxonomy shared by every Sentinel crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SentinelError {
    /// Malformed input; always recoverable by correcting the named field.
    #[error("Validation error on `{field}`: {message}")]
    Validation { field: String, message: String },

    /// A uniqueness rule was violated (slug, client id, scope name, email).
    #[error("Entity already exists: {entity} with this {field}")]
    AlreadyExists { entity: String, field: String },

    /// A write was refused because other rows still depend on the target.
    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    /// Credential or grant failure. Carries no detail on purpose: unknown
    /// client, wrong secret and disallowed scope all look the same.
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// Verification token missing, expired or already consumed.
    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Email delivery failed: {0}")]
    EmailDelivery(String),

    #[error("OAuth engine error: {0}")]
    OAuthEngine(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SentinelError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn already_exists(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity: entity.into(),
            field: field.into(),
        }
    }

    /// `true` when a collaborator (storage, email, OAuth engine) failed.
    /// These are fatal for the current operation; retrying is the caller's call.
    pub fn is_dependency_failure(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::EmailDelivery(_) | Self::OAuthEngine(_)
        )
    }
}

pub type SentinelResult<T> = Result<T, SentinelError>;
