//! Tenant registry: uniqueness guards and the administrative write paths
//! for tenants, clients, scopes and users.
//!
//! Every guard is a read immediately before the write. Concurrent writers
//! can both pass it; the storage unique indexes decide, and their violation
//! surfaces as the same `AlreadyExists` error the guard would have raised.

use std::sync::Arc;

use sentinel_core::collaborator::{ApplicationProjection, ApplicationRegistry};
use sentinel_core::error::{SentinelError, SentinelResult};
use sentinel_core::models::client::{Client, ClientType};
use sentinel_core::models::scope::{Scope, validate_scope_name};
use sentinel_core::models::tenant::{Tenant, normalize_slug};
use sentinel_core::models::user::{User, normalize_email, validate_email};
use sentinel_core::repository::{
    ClientRepository, PaginatedResult, Pagination, ScopeRepository, TenantRepository,
    UserRepository,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::hasher::SecretHasher;

// ---------------------------------------------------------------------------
// Guards
// ---------------------------------------------------------------------------

/// Fail with `AlreadyExists` if another tenant uses the normalized slug.
/// Returns the normalized slug.
pub async fn ensure_unique_tenant_slug<T: TenantRepository>(
    tenants: &T,
    slug: &str,
    except: Option<Uuid>,
) -> SentinelResult<String> {
    let slug = normalize_slug(slug);
    match tenants.find_by_slug(&slug).await? {
        Some(existing) if Some(existing.id()) != except => {
            Err(SentinelError::already_exists("tenant", "slug"))
        }
        _ => Ok(slug),
    }
}

/// Client identifiers are checked across every tenant: the
/// client-credentials grant resolves them without a tenant.
pub async fn ensure_unique_client_id<C: ClientRepository>(
    clients: &C,
    client_id: &str,
    except: Option<Uuid>,
) -> SentinelResult<()> {
    let taken = clients
        .find_all_by_client_id(client_id.trim())
        .await?
        .iter()
        .any(|existing| Some(existing.id()) != except);
    if taken {
        return Err(SentinelError::already_exists("client", "client_id"));
    }
    Ok(())
}

/// Scope names are unique per tenant, and global names across the system.
pub async fn ensure_unique_scope_name<S: ScopeRepository>(
    scopes: &S,
    tenant_id: Option<Uuid>,
    name: &str,
    except: Option<Uuid>,
) -> SentinelResult<()> {
    match scopes.find_by_name(tenant_id, name.trim()).await? {
        Some(existing) if Some(existing.id()) != except => {
            Err(SentinelError::already_exists("scope", "name"))
        }
        _ => Ok(()),
    }
}

/// Returns the normalized email.
pub async fn ensure_unique_user_email<U: UserRepository>(
    users: &U,
    tenant_id: Uuid,
    email: &str,
    except: Option<Uuid>,
) -> SentinelResult<String> {
    let email = normalize_email(email);
    match users.find_by_email(tenant_id, &email).await? {
        Some(existing) if Some(existing.id()) != except => {
            Err(SentinelError::already_exists("user", "email"))
        }
        _ => Ok(email),
    }
}

/// Minimum-length password policy shared by admin creation and
/// self-registration.
pub fn validate_password(password: &str, min_length: usize) -> SentinelResult<()> {
    if password.trim().is_empty() {
        return Err(SentinelError::validation("password", "is required"));
    }
    if password.chars().count() < min_length {
        return Err(SentinelError::validation(
            "password",
            format!("must be at least {min_length} characters"),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CreateTenant {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateTenant {
    pub name: Option<String>,
    pub slug: Option<String>,
}

#[derive(Clone)]
pub struct CreateClient {
    pub tenant_id: Uuid,
    pub client_id: String,
    pub name: String,
    pub client_type: ClientType,
    /// Raw secret; hashed before storage. Required for confidential clients.
    pub client_secret: Option<String>,
    pub redirect_uris: Vec<String>,
    pub allowed_scopes: Vec<String>,
}

#[derive(Clone, Default)]
pub struct UpdateClient {
    pub name: Option<String>,
    pub client_type: Option<ClientType>,
    /// Replaces the stored secret when present.
    pub client_secret: Option<String>,
    pub redirect_uris: Option<Vec<String>>,
    pub allowed_scopes: Option<Vec<String>>,
}

impl std::fmt::Debug for CreateClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateClient")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("name", &self.name)
            .field("client_type", &self.client_type)
            .field("redirect_uris", &self.redirect_uris)
            .field("allowed_scopes", &self.allowed_scopes)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for UpdateClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateClient")
            .field("name", &self.name)
            .field("client_type", &self.client_type)
            .field("redirect_uris", &self.redirect_uris)
            .field("allowed_scopes", &self.allowed_scopes)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct CreateScope {
    /// `None` creates a global scope.
    pub tenant_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateScope {
    pub name: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
    /// `Some(None)` makes the scope global.
    pub tenant_id: Option<Option<Uuid>>,
}

#[derive(Clone)]
pub struct CreateUser {
    pub tenant_id: Uuid,
    pub email: String,
    /// Raw password; hashed before storage.
    pub password: String,
    pub is_active: bool,
    pub is_admin: bool,
}

impl std::fmt::Debug for CreateUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateUser")
            .field("tenant_id", &self.tenant_id)
            .field("email", &self.email)
            .field("is_active", &self.is_active)
            .field("is_admin", &self.is_admin)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Administrative entry point for tenant-owned entities.
///
/// Generic over repository implementations so that the auth layer
/// has no dependency on the database crate.
pub struct TenantRegistry<T, C, S, U, A> {
    tenants: T,
    clients: C,
    scopes: S,
    users: U,
    applications: A,
    hasher: Arc<SecretHasher>,
    min_password_length: usize,
}

impl<T, C, S, U, A> TenantRegistry<T, C, S, U, A>
where
    T: TenantRepository,
    C: ClientRepository,
    S: ScopeRepository,
    U: UserRepository,
    A: ApplicationRegistry,
{
    pub fn new(
        tenants: T,
        clients: C,
        scopes: S,
        users: U,
        applications: A,
        hasher: Arc<SecretHasher>,
        min_password_length: usize,
    ) -> Self {
        Self {
            tenants,
            clients,
            scopes,
            users,
            applications,
            hasher,
            min_password_length,
        }
    }

    pub async fn ensure_unique_tenant_slug(&self, slug: &str) -> SentinelResult<String> {
        ensure_unique_tenant_slug(&self.tenants, slug, None).await
    }

    pub async fn ensure_unique_client_id(&self, client_id: &str) -> SentinelResult<()> {
        ensure_unique_client_id(&self.clients, client_id, None).await
    }

    pub async fn ensure_unique_scope_name(
        &self,
        tenant_id: Option<Uuid>,
        name: &str,
    ) -> SentinelResult<()> {
        ensure_unique_scope_name(&self.scopes, tenant_id, name, None).await
    }

    pub async fn ensure_unique_user_email(
        &self,
        tenant_id: Uuid,
        email: &str,
    ) -> SentinelResult<String> {
        ensure_unique_user_email(&self.users, tenant_id, email, None).await
    }

    // -- tenants ------------------------------------------------------------

    pub async fn create_tenant(&self, input: CreateTenant) -> SentinelResult<Tenant> {
        let tenant = Tenant::new(&input.name, &input.slug)?;
        ensure_unique_tenant_slug(&self.tenants, tenant.slug(), None).await?;
        let tenant = self.tenants.create(tenant).await?;
        info!(tenant_id = %tenant.id(), slug = %tenant.slug(), "tenant created");
        Ok(tenant)
    }

    pub async fn update_tenant(&self, id: Uuid, input: UpdateTenant) -> SentinelResult<Tenant> {
        let current = self.tenants.get_by_id(id).await?;
        let name = input.name.unwrap_or_else(|| current.name().to_string());
        let slug = input.slug.unwrap_or_else(|| current.slug().to_string());
        let tenant = current.renamed(&name, &slug)?;
        ensure_unique_tenant_slug(&self.tenants, tenant.slug(), Some(id)).await?;
        let tenant = self.tenants.update(tenant).await?;
        info!(tenant_id = %id, slug = %tenant.slug(), "tenant updated");
        Ok(tenant)
    }

    /// Refused with `Conflict` while clients or users still belong to it.
    pub async fn delete_tenant(&self, id: Uuid) -> SentinelResult<()> {
        self.tenants.get_by_id(id).await?;
        let clients = self.clients.count_by_tenant(id).await?;
        let users = self.users.count_by_tenant(id).await?;
        if clients > 0 || users > 0 {
            return Err(SentinelError::Conflict {
                message: "tenant has dependent clients or users".into(),
            });
        }
        self.tenants.delete(id).await?;
        info!(tenant_id = %id, "tenant deleted");
        Ok(())
    }

    pub async fn list_tenants(
        &self,
        pagination: Pagination,
    ) -> SentinelResult<PaginatedResult<Tenant>> {
        self.tenants.list(pagination).await
    }

    // -- clients ------------------------------------------------------------

    pub async fn create_client(&self, input: CreateClient) -> SentinelResult<Client> {
        let client = Client::new(
            input.tenant_id,
            &input.client_id,
            &input.name,
            input.client_type,
        )?
        .with_redirect_uris(&input.redirect_uris)?
        .with_allowed_scopes(&input.allowed_scopes)?;
        let secret = checked_secret(client.client_type(), input.client_secret.as_deref(), true)?;

        self.require_tenant(input.tenant_id).await?;
        ensure_unique_client_id(&self.clients, client.client_id(), None).await?;

        let client = match secret {
            Some(secret) => client.with_secret_hash(Some(self.hasher.hash(secret)?))?,
            None => client,
        };
        let client = self.clients.create(client).await?;
        info!(
            tenant_id = %client.tenant_id(),
            client_id = %client.client_id(),
            client_type = %client.client_type(),
            "client created"
        );
        self.project(&client).await?;
        Ok(client)
    }

    /// Switching to public drops the stored secret. A confidential client
    /// keeps its current secret unless a new one is supplied, and must end
    /// up with one.
    pub async fn update_client(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateClient,
    ) -> SentinelResult<Client> {
        let mut client = self.clients.get_by_id(tenant_id, id).await?;
        if let Some(name) = &input.name {
            client = client.with_name(name)?;
        }
        if let Some(client_type) = input.client_type {
            client = client.with_type(client_type);
        }
        if let Some(uris) = &input.redirect_uris {
            client = client.with_redirect_uris(uris)?;
        }
        if let Some(scopes) = &input.allowed_scopes {
            client = client.with_allowed_scopes(scopes)?;
        }
        let secret = checked_secret(
            client.client_type(),
            input.client_secret.as_deref(),
            client.secret_hash().is_none(),
        )?;
        if let Some(secret) = secret {
            client = client.with_secret_hash(Some(self.hasher.hash(secret)?))?;
        }

        let client = self.clients.update(client).await?;
        info!(tenant_id = %tenant_id, client_id = %client.client_id(), "client updated");
        self.project(&client).await?;
        Ok(client)
    }

    pub async fn rotate_client_secret(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        new_secret: &str,
    ) -> SentinelResult<Client> {
        let client = self.clients.get_by_id(tenant_id, id).await?;
        if client.client_type() == ClientType::Public {
            return Err(SentinelError::validation(
                "client_secret",
                "public clients cannot have secrets",
            ));
        }
        let client = client.with_secret_hash(Some(self.hasher.hash(new_secret)?))?;
        let client = self.clients.update(client).await?;
        info!(tenant_id = %tenant_id, client_id = %client.client_id(), "client secret rotated");
        Ok(client)
    }

    pub async fn delete_client(&self, tenant_id: Uuid, id: Uuid) -> SentinelResult<()> {
        let client = self.clients.get_by_id(tenant_id, id).await?;
        self.clients.delete(tenant_id, id).await?;
        info!(tenant_id = %tenant_id, client_id = %client.client_id(), "client deleted");
        self.applications
            .remove(tenant_id, client.client_id())
            .await
            .inspect_err(|e| {
                warn!(
                    tenant_id = %tenant_id,
                    client_id = %client.client_id(),
                    error = %e,
                    "application registry removal failed"
                )
            })
    }

    /// Push the current projection of a client to the application registry,
    /// repairing drift left by an earlier failed sync.
    pub async fn resync_application(&self, tenant_id: Uuid, id: Uuid) -> SentinelResult<()> {
        let client = self.clients.get_by_id(tenant_id, id).await?;
        self.project(&client).await
    }

    pub async fn get_client(&self, tenant_id: Uuid, id: Uuid) -> SentinelResult<Client> {
        self.clients.get_by_id(tenant_id, id).await
    }

    pub async fn list_clients(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> SentinelResult<PaginatedResult<Client>> {
        self.clients.list(tenant_id, pagination).await
    }

    // -- scopes -------------------------------------------------------------

    pub async fn create_scope(&self, input: CreateScope) -> SentinelResult<Scope> {
        let scope = Scope::new(&input.name, input.description.as_deref(), input.tenant_id)?;
        if let Some(tenant_id) = scope.tenant_id() {
            self.require_tenant(tenant_id).await?;
        }
        ensure_unique_scope_name(&self.scopes, scope.tenant_id(), scope.name(), None).await?;
        let scope = self.scopes.create(scope).await?;
        info!(scope = %scope.name(), tenant_id = ?scope.tenant_id(), "scope created");
        Ok(scope)
    }

    pub async fn update_scope(&self, id: Uuid, input: UpdateScope) -> SentinelResult<Scope> {
        let current = self.scopes.get_by_id(id).await?;
        let name = match &input.name {
            Some(name) => validate_scope_name("name", name)?,
            None => current.name().to_string(),
        };
        let description = match input.description {
            Some(description) => description,
            None => current.description().map(str::to_string),
        };
        let tenant_id = input.tenant_id.unwrap_or(current.tenant_id());

        let scope = current.updated(&name, description.as_deref(), tenant_id)?;
        if let Some(tenant_id) = scope.tenant_id() {
            self.require_tenant(tenant_id).await?;
        }
        ensure_unique_scope_name(&self.scopes, scope.tenant_id(), scope.name(), Some(id)).await?;
        let scope = self.scopes.update(scope).await?;
        info!(scope = %scope.name(), tenant_id = ?scope.tenant_id(), "scope updated");
        Ok(scope)
    }

    /// Refused with `Conflict` while any client that can see the scope lists
    /// its name, compared case-insensitively.
    pub async fn delete_scope(&self, id: Uuid) -> SentinelResult<()> {
        let scope = self.scopes.get_by_id(id).await?;
        if self
            .clients
            .any_references_scope(scope.tenant_id(), scope.name())
            .await?
        {
            return Err(SentinelError::Conflict {
                message: format!("scope `{}` is used by one or more clients", scope.name()),
            });
        }
        self.scopes.delete(id).await?;
        info!(scope = %scope.name(), tenant_id = ?scope.tenant_id(), "scope deleted");
        Ok(())
    }

    pub async fn list_scopes(
        &self,
        tenant_id: Option<Uuid>,
        pagination: Pagination,
    ) -> SentinelResult<PaginatedResult<Scope>> {
        self.scopes.list(tenant_id, pagination).await
    }

    // -- users --------------------------------------------------------------

    pub async fn create_user(&self, input: CreateUser) -> SentinelResult<User> {
        validate_password(&input.password, self.min_password_length)?;
        validate_email(&input.email)?;

        self.require_tenant(input.tenant_id).await?;
        let email =
            ensure_unique_user_email(&self.users, input.tenant_id, &input.email, None).await?;

        let user = User::new(input.tenant_id, &email, self.hasher.hash(&input.password)?)?
            .with_admin(input.is_admin);
        let user = if input.is_active {
            user
        } else {
            user.deactivated()
        };
        let user = self.users.create(user).await?;
        info!(tenant_id = %user.tenant_id(), user_id = %user.id(), "user created");
        Ok(user)
    }

    pub async fn set_user_active(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        active: bool,
    ) -> SentinelResult<User> {
        let user = self.users.get_by_id(tenant_id, id).await?;
        let user = if active {
            user.activated()
        } else {
            user.deactivated()
        };
        let user = self.users.update(user).await?;
        info!(tenant_id = %tenant_id, user_id = %id, active, "user activation changed");
        Ok(user)
    }

    pub async fn change_password(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        new_password: &str,
    ) -> SentinelResult<User> {
        validate_password(new_password, self.min_password_length)?;
        let user = self.users.get_by_id(tenant_id, id).await?;
        let user = user.with_password_hash(self.hasher.hash(new_password)?)?;
        let user = self.users.update(user).await?;
        info!(tenant_id = %tenant_id, user_id = %id, "user password changed");
        Ok(user)
    }

    pub async fn list_users(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> SentinelResult<PaginatedResult<User>> {
        self.users.list(tenant_id, pagination).await
    }

    // -- helpers ------------------------------------------------------------

    async fn require_tenant(&self, tenant_id: Uuid) -> SentinelResult<Tenant> {
        match self.tenants.get_by_id(tenant_id).await {
            Err(SentinelError::NotFound { .. }) => Err(SentinelError::validation(
                "tenant_id",
                "tenant does not exist",
            )),
            other => other,
        }
    }

    /// The core write already happened; a registry failure is reported but
    /// the core record stays authoritative.
    async fn project(&self, client: &Client) -> SentinelResult<()> {
        self.applications
            .upsert(ApplicationProjection::from(client))
            .await
            .inspect_err(|e| {
                warn!(
                    tenant_id = %client.tenant_id(),
                    client_id = %client.client_id(),
                    error = %e,
                    "application registry sync failed"
                )
            })
    }
}

/// Check a supplied secret against the client type. `required` is whether a
/// confidential client must receive one in this call.
fn checked_secret(
    client_type: ClientType,
    secret: Option<&str>,
    required: bool,
) -> SentinelResult<Option<&str>> {
    let secret = secret.filter(|s| !s.trim().is_empty());
    match (client_type, secret) {
        (ClientType::Public, Some(_)) => Err(SentinelError::validation(
            "client_secret",
            "public clients cannot have secrets",
        )),
        (ClientType::Public, None) => Ok(None),
        (ClientType::Confidential, None) if required => Err(SentinelError::validation(
            "client_secret",
            "is required for confidential clients",
        )),
        (ClientType::Confidential, secret) => Ok(secret),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_policy() {
        assert!(validate_password("", 6).is_err());
        assert!(validate_password("      ", 6).is_err());
        assert!(validate_password("abc12", 6).is_err());
        assert!(validate_password("abc123", 6).is_ok());
    }

    #[test]
    fn secrets_follow_client_type() {
        assert!(checked_secret(ClientType::Public, Some("s"), false).is_err());
        assert_eq!(checked_secret(ClientType::Public, Some("  "), true).unwrap(), None);
        assert!(checked_secret(ClientType::Confidential, None, true).is_err());
        assert_eq!(
            checked_secret(ClientType::Confidential, None, false).unwrap(),
            None
        );
        assert_eq!(
            checked_secret(ClientType::Confidential, Some("s3cret"), true).unwrap(),
            Some("s3cret")
        );
    }
}
