//! Single-use, time-bound email verification tokens.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use sentinel_core::error::SentinelResult;
use sentinel_core::models::user::User;
use sentinel_core::models::verification_token::{EmailVerificationToken, TokenState};
use sentinel_core::repository::VerificationTokenRepository;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::TokenError;

/// Random bytes per token before encoding.
pub const TOKEN_BYTES: usize = 32;

/// Generate a cryptographically random opaque token
/// (32 bytes → base64url-encoded, no padding).
pub fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; TOKEN_BYTES] = rand::Rng::random(&mut rng);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// SHA-256 hash of a raw token, hex-encoded. This is what gets stored.
pub fn hash_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

/// A freshly issued token. `token` is the only copy of the raw value.
#[derive(Clone)]
pub struct IssuedToken {
    pub token: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedToken")
            .field("user_id", &self.user_id)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

pub struct VerificationTokenManager<V: VerificationTokenRepository> {
    tokens: V,
}

impl<V: VerificationTokenRepository> VerificationTokenManager<V> {
    pub fn new(tokens: V) -> Self {
        Self { tokens }
    }

    pub async fn issue(&self, user_id: Uuid, lifetime: Duration) -> SentinelResult<IssuedToken> {
        self.issue_at(user_id, lifetime, Utc::now()).await
    }

    /// Issue a token valid until `now + lifetime`.
    pub async fn issue_at(
        &self,
        user_id: Uuid,
        lifetime: Duration,
        now: DateTime<Utc>,
    ) -> SentinelResult<IssuedToken> {
        let token = generate_token();
        let record = EmailVerificationToken::new(user_id, &hash_token(&token), now, lifetime)?;
        let record = self.tokens.create(record).await?;
        info!(user_id = %user_id, expires_at = %record.expires_at(), "verification token issued");
        Ok(IssuedToken {
            token,
            user_id,
            expires_at: record.expires_at(),
        })
    }

    /// True when the user has been sent at least one token and has never
    /// consumed any. Users created or deactivated by an administrator have
    /// no such history and are not eligible for a resend.
    pub async fn awaiting_verification(&self, user_id: Uuid) -> SentinelResult<bool> {
        let issued = self.tokens.find_by_user(user_id).await?;
        Ok(!issued.is_empty() && issued.iter().all(|t| t.consumed_at().is_none()))
    }

    /// Consume a token and activate its user in one atomic step.
    ///
    /// Exactly one caller per token gets the user back. Unknown, expired
    /// and already-used tokens all fail as `InvalidToken`.
    pub async fn consume(&self, token: &str, now: DateTime<Utc>) -> SentinelResult<User> {
        let token = token.trim();
        if token.is_empty() {
            return Err(self.reject(TokenError::NotFound));
        }
        let token_hash = hash_token(token);

        if let Some(user) = self.tokens.consume_and_activate(&token_hash, now).await? {
            info!(
                tenant_id = %user.tenant_id(),
                user_id = %user.id(),
                "email verified"
            );
            return Ok(user);
        }

        // Lost: work out why, for the log only.
        let cause = match self.tokens.find_by_token_hash(&token_hash).await? {
            None => TokenError::NotFound,
            Some(record) => match record.state_at(now) {
                TokenState::Expired => TokenError::Expired,
                TokenState::Consumed | TokenState::Valid => TokenError::AlreadyConsumed,
            },
        };
        Err(self.reject(cause))
    }

    fn reject(&self, cause: TokenError) -> sentinel_core::SentinelError {
        debug!(cause = %cause, "verification token rejected");
        cause.into()
    }
}
