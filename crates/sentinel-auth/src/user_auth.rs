//! Password sign-in for human users.

use std::sync::Arc;

use sentinel_core::error::{SentinelError, SentinelResult};
use sentinel_core::models::user::{User, normalize_email};
use sentinel_core::repository::UserRepository;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::AuthError;
use crate::hasher::SecretHasher;

/// A signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub email: String,
    pub is_admin: bool,
}

pub struct UserAuthenticator<U: UserRepository> {
    users: U,
    hasher: Arc<SecretHasher>,
}

impl<U: UserRepository> UserAuthenticator<U> {
    pub fn new(users: U, hasher: Arc<SecretHasher>) -> Self {
        Self { users, hasher }
    }

    /// Unknown email, wrong password and inactive account are one opaque
    /// `AuthenticationFailed`. The password is checked before the active
    /// flag so all three paths cost one key derivation.
    pub async fn authenticate(
        &self,
        tenant_id: Uuid,
        email: &str,
        password: &str,
    ) -> SentinelResult<AuthenticatedUser> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            self.hasher.verify_dummy(password);
            return Err(reject(tenant_id, AuthError::InvalidUserCredentials));
        }

        let Some(user) = self.users.find_by_email(tenant_id, &email).await? else {
            self.hasher.verify_dummy(password);
            return Err(reject(tenant_id, AuthError::InvalidUserCredentials));
        };
        if !self.hasher.verify(password, user.password_hash()) {
            return Err(reject(tenant_id, AuthError::InvalidUserCredentials));
        }
        if !user.is_active() {
            return Err(reject(tenant_id, AuthError::InactiveUser));
        }

        let user = if self.hasher.needs_rehash(user.password_hash()) {
            let user_id = user.id();
            match self.upgrade_hash(user.clone(), password).await {
                Ok(upgraded) => {
                    info!(tenant_id = %tenant_id, user_id = %user_id, "password hash upgraded");
                    upgraded
                }
                Err(e) => {
                    warn!(
                        tenant_id = %tenant_id,
                        user_id = %user_id,
                        error = %e,
                        "password hash upgrade failed"
                    );
                    user
                }
            }
        } else {
            user
        };

        info!(tenant_id = %tenant_id, user_id = %user.id(), "user signed in");
        Ok(AuthenticatedUser {
            user_id: user.id(),
            tenant_id: user.tenant_id(),
            email: user.email().to_string(),
            is_admin: user.is_admin(),
        })
    }

    /// Re-hash with the current parameters after a successful sign-in.
    async fn upgrade_hash(&self, user: User, password: &str) -> SentinelResult<User> {
        let user = user.with_password_hash(self.hasher.hash(password)?)?;
        self.users.update(user).await
    }
}

fn reject(tenant_id: Uuid, cause: AuthError) -> SentinelError {
    debug!(tenant_id = %tenant_id, cause = %cause, "user sign-in rejected");
    cause.into()
}
