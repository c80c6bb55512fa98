//! One-way hashing of passwords and client secrets with PBKDF2.
//!
//! Records are PHC strings such as
//! `$pbkdf2-sha256$i=100000,l=32$<salt>$<key>`. Algorithm, iteration count
//! and key length live in each record, so raising the configured cost never
//! breaks verification of older records.

use std::sync::OnceLock;

use pbkdf2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use pbkdf2::{Algorithm, Params, Pbkdf2};
use rand::Rng;
use sentinel_core::error::{SentinelError, SentinelResult};

use crate::config::{HashAlgorithm, HasherConfig};

impl HashAlgorithm {
    fn pbkdf2(self) -> Algorithm {
        match self {
            HashAlgorithm::Pbkdf2Sha256 => Algorithm::Pbkdf2Sha256,
            HashAlgorithm::Pbkdf2Sha512 => Algorithm::Pbkdf2Sha512,
        }
    }
}

/// Stateless apart from its configuration; cheap to share behind `&`.
#[derive(Debug)]
pub struct SecretHasher {
    config: HasherConfig,
    /// Record verified against when there is nothing real to check, so
    /// failure paths cost one key derivation like the success path.
    dummy_record: OnceLock<Option<String>>,
}

impl SecretHasher {
    pub fn new(config: HasherConfig) -> SentinelResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            dummy_record: OnceLock::new(),
        })
    }

    pub fn config(&self) -> &HasherConfig {
        &self.config
    }

    /// Hash `secret` with a fresh random salt.
    pub fn hash(&self, secret: &str) -> SentinelResult<String> {
        if secret.trim().is_empty() {
            return Err(SentinelError::validation("secret", "is required"));
        }

        let mut salt_bytes = vec![0u8; self.config.salt_len];
        rand::rng().fill(salt_bytes.as_mut_slice());
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| SentinelError::Crypto(format!("salt encoding: {e}")))?;

        let params = Params {
            rounds: self.config.iterations,
            output_length: self.config.key_len,
        };
        let hash = Pbkdf2
            .hash_password_customized(
                secret.as_bytes(),
                Some(self.config.algorithm.pbkdf2().ident()),
                None,
                params,
                &salt,
            )
            .map_err(|e| SentinelError::Crypto(format!("key derivation: {e}")))?;

        Ok(hash.to_string())
    }

    /// Check `secret` against a stored record.
    ///
    /// Never errors: an empty secret or a malformed record is simply
    /// `false`. The final key comparison is constant-time.
    pub fn verify(&self, secret: &str, record: &str) -> bool {
        if secret.is_empty() {
            return false;
        }
        let Ok(parsed) = PasswordHash::new(record) else {
            return false;
        };
        Pbkdf2.verify_password(secret.as_bytes(), &parsed).is_ok()
    }

    /// Burn one verification's worth of work and return `false`.
    ///
    /// Used where a lookup already failed (unknown client, no stored
    /// secret) so those branches take as long as a wrong secret.
    pub fn verify_dummy(&self, secret: &str) -> bool {
        let record = self
            .dummy_record
            .get_or_init(|| self.hash("sentinel-dummy-secret").ok());
        if let Some(record) = record {
            let candidate = if secret.is_empty() { "-" } else { secret };
            let _ = self.verify(candidate, record);
        }
        false
    }

    /// Whether a record was made with weaker or different parameters than
    /// the current configuration and should be replaced on next login.
    pub fn needs_rehash(&self, record: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(record) else {
            return true;
        };
        if parsed.algorithm != self.config.algorithm.pbkdf2().ident() {
            return true;
        }
        match Params::try_from(&parsed) {
            Ok(params) => {
                params.rounds < self.config.iterations
                    || params.output_length < self.config.key_len
            }
            Err(_) => true,
        }
    }
}
