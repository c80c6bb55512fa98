//! User domain model.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::{require_id, require_non_blank};
use crate::error::{SentinelError, SentinelResult};

/// Trim and lowercase an email address. Lookups and uniqueness checks
/// always run on the normalized form.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// A human principal bound to a tenant. Never hard-deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    id: Uuid,
    tenant_id: Uuid,
    email: String,
    #[serde(skip_serializing)]
    password_hash: String,
    is_active: bool,
    is_admin: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl User {
    /// Create an active, non-admin user. `password_hash` must come from the
    /// secret hasher.
    pub fn new(tenant_id: Uuid, email: &str, password_hash: String) -> SentinelResult<Self> {
        let now = Utc::now();
        Self::restore(
            Uuid::new_v4(),
            tenant_id,
            email,
            password_hash,
            true,
            false,
            now,
            now,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: Uuid,
        tenant_id: Uuid,
        email: &str,
        password_hash: String,
        is_active: bool,
        is_admin: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> SentinelResult<Self> {
        Ok(Self {
            id,
            tenant_id: require_id("tenant_id", tenant_id)?,
            email: validate_email(email)?,
            password_hash: require_non_blank("password_hash", &password_hash)?,
            is_active,
            is_admin,
            created_at,
            updated_at,
        })
    }

    pub fn activated(self) -> Self {
        Self {
            is_active: true,
            updated_at: Utc::now(),
            ..self
        }
    }

    pub fn deactivated(self) -> Self {
        Self {
            is_active: false,
            updated_at: Utc::now(),
            ..self
        }
    }

    pub fn with_admin(self, is_admin: bool) -> Self {
        Self {
            is_admin,
            updated_at: Utc::now(),
            ..self
        }
    }

    pub fn with_password_hash(self, password_hash: String) -> SentinelResult<Self> {
        Ok(Self {
            password_hash: require_non_blank("password_hash", &password_hash)?,
            updated_at: Utc::now(),
            ..self
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Normalize an email address and check its basic `local@domain` shape.
pub fn validate_email(email: &str) -> SentinelResult<String> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(SentinelError::validation("email", "is required"));
    }
    let well_formed = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !well_formed {
        return Err(SentinelError::validation("email", "is not a valid address"));
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_normalized() {
        let user = User::new(Uuid::new_v4(), "  Alice@Example.COM ", "hash".into()).unwrap();
        assert_eq!(user.email(), "alice@example.com");
        assert!(user.is_active());
        assert!(!user.is_admin());
    }

    #[test]
    fn malformed_emails_are_rejected() {
        let tenant = Uuid::new_v4();
        for email in ["", "alice", "@example.com", "alice@", "a b@example.com", "a@b@c"] {
            assert!(
                User::new(tenant, email, "hash".into()).is_err(),
                "accepted {email:?}"
            );
        }
    }

    #[test]
    fn password_hash_is_required() {
        assert!(User::new(Uuid::new_v4(), "a@example.com", "  ".into()).is_err());
        let user = User::new(Uuid::new_v4(), "a@example.com", "hash".into()).unwrap();
        assert!(user.with_password_hash(String::new()).is_err());
    }

    #[test]
    fn activation_transitions() {
        let user = User::new(Uuid::new_v4(), "a@example.com", "hash".into())
            .unwrap()
            .deactivated();
        assert!(!user.is_active());
        assert!(user.activated().is_active());
    }

    #[test]
    fn nil_tenant_is_rejected() {
        assert!(User::new(Uuid::nil(), "a@example.com", "hash".into()).is_err());
    }
}
