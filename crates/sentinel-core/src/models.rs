//! Domain models for Sentinel.
//!
//! Entities keep their fields private. Construction (`new`), rehydration
//! from storage (`restore`) and every mutation go through the same
//! invariant checks, so an invalid entity cannot be built.

pub mod client;
pub mod principal;
pub mod scope;
pub mod tenant;
pub mod user;
pub mod verification_token;

use crate::error::{SentinelError, SentinelResult};

/// Trim `value` and reject it if nothing is left.
pub(crate) fn require_non_blank(field: &str, value: &str) -> SentinelResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SentinelError::validation(field, "is required"));
    }
    Ok(trimmed.to_string())
}

/// Reject the nil UUID used as an "unset" foreign key.
pub(crate) fn require_id(field: &str, id: uuid::Uuid) -> SentinelResult<uuid::Uuid> {
    if id.is_nil() {
        return Err(SentinelError::validation(field, "is required"));
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_are_rejected() {
        assert!(require_non_blank("name", "   ").is_err());
        assert_eq!(require_non_blank("name", "  Acme ").unwrap(), "Acme");
    }

    #[test]
    fn nil_ids_are_rejected() {
        assert!(require_id("tenant_id", uuid::Uuid::nil()).is_err());
        assert!(require_id("tenant_id", uuid::Uuid::new_v4()).is_ok());
    }
}
