//! Self-service registration with email verification.

use std::sync::Arc;

use chrono::Utc;
use sentinel_core::collaborator::EmailSender;
use sentinel_core::error::{SentinelError, SentinelResult};
use sentinel_core::models::tenant::{Tenant, normalize_slug};
use sentinel_core::models::user::{User, validate_email};
use sentinel_core::repository::{TenantRepository, UserRepository, VerificationTokenRepository};
use tracing::{debug, info, warn};

use crate::config::AuthConfig;
use crate::email::verification_email;
use crate::hasher::SecretHasher;
use crate::registry::{ensure_unique_user_email, validate_password};
use crate::verification::VerificationTokenManager;

/// Registration form input.
#[derive(Clone)]
pub struct RegisterInput {
    pub tenant_slug: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl std::fmt::Debug for RegisterInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterInput")
            .field("tenant_slug", &self.tenant_slug)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

pub struct RegistrationService<T, U, V, E>
where
    T: TenantRepository,
    U: UserRepository,
    V: VerificationTokenRepository,
    E: EmailSender,
{
    tenants: T,
    users: U,
    tokens: VerificationTokenManager<V>,
    email: E,
    hasher: Arc<SecretHasher>,
    config: AuthConfig,
}

impl<T, U, V, E> RegistrationService<T, U, V, E>
where
    T: TenantRepository,
    U: UserRepository,
    V: VerificationTokenRepository,
    E: EmailSender,
{
    pub fn new(
        tenants: T,
        users: U,
        tokens: VerificationTokenManager<V>,
        email: E,
        hasher: Arc<SecretHasher>,
        config: AuthConfig,
    ) -> Self {
        Self {
            tenants,
            users,
            tokens,
            email,
            hasher,
            config,
        }
    }

    /// Register a user in the tenant named by slug.
    ///
    /// With verification required the user starts inactive and receives a
    /// link; otherwise the user is active immediately and no email is sent.
    pub async fn register(&self, input: RegisterInput) -> SentinelResult<User> {
        if input.tenant_slug.trim().is_empty() {
            return Err(SentinelError::validation("tenant_slug", "is required"));
        }
        let email = validate_email(&input.email)?;
        let lifetime = self.config.verification_token_lifetime()?;
        validate_password(&input.password, self.config.min_password_length)?;
        if input.password != input.confirm_password {
            return Err(SentinelError::validation(
                "confirm_password",
                "passwords do not match",
            ));
        }

        let tenant = self.resolve_tenant(&input.tenant_slug).await?;
        let email = ensure_unique_user_email(&self.users, tenant.id(), &email, None).await?;

        let user = User::new(tenant.id(), &email, self.hasher.hash(&input.password)?)?;
        if !self.config.require_email_verification {
            let user = self.users.create(user).await?;
            info!(tenant_id = %tenant.id(), user_id = %user.id(), "user registered");
            return Ok(user);
        }

        // The token goes in first so a stored pending user always has one
        // and can ask for a resend if delivery fails.
        let issued = self.tokens.issue(user.id(), lifetime).await?;
        let user = self.users.create(user.deactivated()).await?;
        info!(tenant_id = %tenant.id(), user_id = %user.id(), "user registered");

        self.send_verification(&user, &issued.token).await?;
        Ok(user)
    }

    /// Send a fresh verification link to a user still awaiting
    /// verification.
    ///
    /// Unknown, active and administratively managed accounts are a silent
    /// no-op so the response does not reveal which addresses are pending.
    pub async fn resend_verification(&self, tenant_slug: &str, email: &str) -> SentinelResult<()> {
        if tenant_slug.trim().is_empty() {
            return Err(SentinelError::validation("tenant_slug", "is required"));
        }
        let email = validate_email(email)?;
        let lifetime = self.config.verification_token_lifetime()?;
        let tenant = self.resolve_tenant(tenant_slug).await?;

        let Some(user) = self.users.find_by_email(tenant.id(), &email).await? else {
            debug!(tenant_id = %tenant.id(), "verification resend for unknown email ignored");
            return Ok(());
        };
        if user.is_active() || !self.tokens.awaiting_verification(user.id()).await? {
            debug!(
                tenant_id = %tenant.id(),
                user_id = %user.id(),
                "verification resend for settled account ignored"
            );
            return Ok(());
        }

        let issued = self.tokens.issue(user.id(), lifetime).await?;
        info!(tenant_id = %tenant.id(), user_id = %user.id(), "verification email re-sent");
        self.send_verification(&user, &issued.token).await
    }

    /// Verify an email address from the link's `token` parameter.
    pub async fn verify(&self, token: &str) -> SentinelResult<User> {
        self.tokens.consume(token, Utc::now()).await
    }

    async fn resolve_tenant(&self, slug: &str) -> SentinelResult<Tenant> {
        self.tenants
            .find_by_slug(&normalize_slug(slug))
            .await?
            .ok_or_else(|| SentinelError::validation("tenant_slug", "tenant not found"))
    }

    async fn send_verification(&self, user: &User, token: &str) -> SentinelResult<()> {
        let message = verification_email(&self.config, user.email(), token);
        self.email.send(message).await.inspect_err(|e| {
            warn!(user_id = %user.id(), error = %e, "verification email not delivered")
        })
    }
}
