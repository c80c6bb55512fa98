//! Authentication configuration.

use chrono::Duration;
use sentinel_core::error::{SentinelError, SentinelResult};

/// Digest used inside PBKDF2. Stored in every hash record, so records made
/// with either algorithm keep verifying after the default changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Pbkdf2Sha256,
    Pbkdf2Sha512,
}

/// Lower bounds enforced by [`HasherConfig::validate`].
pub const MIN_ITERATIONS: u32 = 100_000;
pub const MIN_SALT_LEN: usize = 16;
pub const MIN_KEY_LEN: usize = 32;

/// Upper bound for `verification_token_lifetime_secs` (30 days).
pub const MAX_VERIFICATION_TOKEN_LIFETIME_SECS: u64 = 30 * 86_400;

/// Parameters for newly created secret hashes.
#[derive(Debug, Clone)]
pub struct HasherConfig {
    pub algorithm: HashAlgorithm,
    /// PBKDF2 rounds (default: 100_000).
    pub iterations: u32,
    /// Random salt bytes per record (default: 16).
    pub salt_len: usize,
    /// Derived key bytes (default: 32).
    pub key_len: usize,
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::Pbkdf2Sha256,
            iterations: MIN_ITERATIONS,
            salt_len: MIN_SALT_LEN,
            key_len: MIN_KEY_LEN,
        }
    }
}

impl HasherConfig {
    pub fn validate(&self) -> SentinelResult<()> {
        if self.iterations < MIN_ITERATIONS {
            return Err(SentinelError::validation(
                "iterations",
                format!("must be at least {MIN_ITERATIONS}"),
            ));
        }
        // Upper bounds come from the PHC salt/output limits (64 bytes each).
        if !(MIN_SALT_LEN..=48).contains(&self.salt_len) {
            return Err(SentinelError::validation(
                "salt_len",
                format!("must be between {MIN_SALT_LEN} and 48 bytes"),
            ));
        }
        if !(MIN_KEY_LEN..=64).contains(&self.key_len) {
            return Err(SentinelError::validation(
                "key_len",
                format!("must be between {MIN_KEY_LEN} and 64 bytes"),
            ));
        }
        Ok(())
    }
}

/// Configuration for the authentication services.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub hasher: HasherConfig,
    /// Email verification token lifetime in seconds (default: 86_400 = 24 hours).
    pub verification_token_lifetime_secs: u64,
    /// Page that receives `?token=...` from the verification email.
    pub verification_base_url: String,
    /// Minimum password length for policy enforcement.
    pub min_password_length: usize,
    /// When set, self-registered users start inactive until they verify.
    pub require_email_verification: bool,
    pub email_subject: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            hasher: HasherConfig::default(),
            verification_token_lifetime_secs: 86_400,
            verification_base_url: "http://localhost:8080/account/verify".into(),
            min_password_length: 6,
            require_email_verification: true,
            email_subject: "Verify your email address".into(),
        }
    }
}

impl AuthConfig {
    pub fn verification_token_lifetime(&self) -> SentinelResult<Duration> {
        let secs = self.verification_token_lifetime_secs;
        if !(1..=MAX_VERIFICATION_TOKEN_LIFETIME_SECS).contains(&secs) {
            return Err(SentinelError::validation(
                "verification_token_lifetime_secs",
                format!("must be between 1 and {MAX_VERIFICATION_TOKEN_LIFETIME_SECS} seconds"),
            ));
        }
        i64::try_from(secs)
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or_else(|| {
                SentinelError::validation("verification_token_lifetime_secs", "is out of range")
            })
    }
}
