//! Email verification token model.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::{require_id, require_non_blank};
use crate::error::{SentinelError, SentinelResult};

/// State of a token at a given instant. `Expired` is evaluated, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Valid,
    Consumed,
    Expired,
}

/// A single-use proof of email ownership.
///
/// Only the SHA-256 digest of the token is kept; the raw value is handed to
/// the user once and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailVerificationToken {
    id: Uuid,
    user_id: Uuid,
    token_hash: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    consumed_at: Option<DateTime<Utc>>,
}

impl EmailVerificationToken {
    pub fn new(
        user_id: Uuid,
        token_hash: &str,
        now: DateTime<Utc>,
        lifetime: Duration,
    ) -> SentinelResult<Self> {
        if lifetime <= Duration::zero() {
            return Err(SentinelError::validation("lifetime", "must be positive"));
        }
        let expires_at = now
            .checked_add_signed(lifetime)
            .ok_or_else(|| SentinelError::validation("lifetime", "is out of range"))?;
        Self::restore(Uuid::new_v4(), user_id, token_hash, expires_at, now, None)
    }

    pub fn restore(
        id: Uuid,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
        consumed_at: Option<DateTime<Utc>>,
    ) -> SentinelResult<Self> {
        Ok(Self {
            id,
            user_id: require_id("user_id", user_id)?,
            token_hash: require_non_blank("token_hash", token_hash)?,
            expires_at,
            created_at,
            consumed_at,
        })
    }

    /// Consumption wins over expiry: a used token reports `Consumed` forever.
    pub fn state_at(&self, now: DateTime<Utc>) -> TokenState {
        if self.consumed_at.is_some() {
            TokenState::Consumed
        } else if now > self.expires_at {
            TokenState::Expired
        } else {
            TokenState::Valid
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn token_hash(&self) -> &str {
        &self.token_hash
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn consumed_at(&self) -> Option<DateTime<Utc>> {
        self.consumed_at
    }
}
