//! Authentication and verification-token error types.
//!
//! These carry the concrete cause for logging. Converting into
//! [`SentinelError`] collapses them to the opaque public outcome.

use sentinel_core::error::SentinelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("unknown client")]
    UnknownClient,

    #[error("client identifier matches more than one tenant")]
    AmbiguousClient,

    #[error("public clients cannot use a secret-based grant")]
    PublicClient,

    #[error("client has no secret configured")]
    MissingSecret,

    #[error("client secret does not match")]
    SecretMismatch,

    #[error("requested scope is not allowed")]
    ScopeNotAllowed,

    #[error("malformed client credentials")]
    MalformedCredentials,

    #[error("unsupported grant type")]
    UnsupportedGrantType,

    #[error("redirect URI is not registered")]
    RedirectUriMismatch,

    #[error("invalid user credentials")]
    InvalidUserCredentials,

    #[error("account is inactive")]
    InactiveUser,
}

impl From<AuthError> for SentinelError {
    fn from(_: AuthError) -> Self {
        SentinelError::AuthenticationFailed
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("verification token not found")]
    NotFound,

    #[error("verification token has expired")]
    Expired,

    #[error("verification token was already used")]
    AlreadyConsumed,
}

impl From<TokenError> for SentinelError {
    fn from(_: TokenError) -> Self {
        SentinelError::InvalidToken
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_collapse_to_one_outcome() {
        let causes = [
            AuthError::UnknownClient,
            AuthError::PublicClient,
            AuthError::MissingSecret,
            AuthError::SecretMismatch,
            AuthError::ScopeNotAllowed,
        ];
        let rendered: Vec<String> = causes
            .into_iter()
            .map(|e| SentinelError::from(e).to_string())
            .collect();
        assert!(rendered.iter().all(|m| m == "Authentication failed"));
    }

    #[test]
    fn token_errors_collapse_to_invalid_token() {
        for err in [TokenError::NotFound, TokenError::Expired, TokenError::AlreadyConsumed] {
            assert!(matches!(
                SentinelError::from(err),
                SentinelError::InvalidToken
            ));
        }
    }
}
