//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Writes take a fully validated
//! entity; implementations must enforce the uniqueness rules with storage
//! constraints and report violations as `SentinelError::AlreadyExists`.
//! `get_*` lookups fail with `NotFound`, `find_*` lookups return `None`.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::SentinelResult;
use crate::models::client::Client;
use crate::models::scope::Scope;
use crate::models::tenant::Tenant;
use crate::models::user::User;
use crate::models::verification_token::EmailVerificationToken;

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Tenant (global scope)
// ---------------------------------------------------------------------------

pub trait TenantRepository: Send + Sync {
    fn create(&self, tenant: Tenant) -> impl Future<Output = SentinelResult<Tenant>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = SentinelResult<Tenant>> + Send;
    /// `slug` must already be normalized.
    fn find_by_slug(
        &self,
        slug: &str,
    ) -> impl Future<Output = SentinelResult<Option<Tenant>>> + Send;
    fn update(&self, tenant: Tenant) -> impl Future<Output = SentinelResult<Tenant>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = SentinelResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = SentinelResult<PaginatedResult<Tenant>>> + Send;
}

// ---------------------------------------------------------------------------
// Tenant-scoped repositories
// ---------------------------------------------------------------------------

pub trait ClientRepository: Send + Sync {
    fn create(&self, client: Client) -> impl Future<Output = SentinelResult<Client>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = SentinelResult<Client>> + Send;
    fn find_by_client_id(
        &self,
        tenant_id: Uuid,
        client_id: &str,
    ) -> impl Future<Output = SentinelResult<Option<Client>>> + Send;
    /// Every client with this identifier, across all tenants.
    fn find_all_by_client_id(
        &self,
        client_id: &str,
    ) -> impl Future<Output = SentinelResult<Vec<Client>>> + Send;
    fn update(&self, client: Client) -> impl Future<Output = SentinelResult<Client>> + Send;
    fn delete(&self, tenant_id: Uuid, id: Uuid)
    -> impl Future<Output = SentinelResult<()>> + Send;
    fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = SentinelResult<PaginatedResult<Client>>> + Send;
    fn count_by_tenant(&self, tenant_id: Uuid) -> impl Future<Output = SentinelResult<u64>> + Send;
    /// Whether any client lists `scope_name` (compared case-insensitively)
    /// among its allowed scopes. `None` searches every tenant.
    fn any_references_scope(
        &self,
        tenant_id: Option<Uuid>,
        scope_name: &str,
    ) -> impl Future<Output = SentinelResult<bool>> + Send;
}

pub trait ScopeRepository: Send + Sync {
    fn create(&self, scope: Scope) -> impl Future<Output = SentinelResult<Scope>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = SentinelResult<Scope>> + Send;
    /// `tenant_id = None` addresses the global namespace.
    fn find_by_name(
        &self,
        tenant_id: Option<Uuid>,
        name: &str,
    ) -> impl Future<Output = SentinelResult<Option<Scope>>> + Send;
    fn update(&self, scope: Scope) -> impl Future<Output = SentinelResult<Scope>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = SentinelResult<()>> + Send;
    /// Scopes owned by exactly this tenant, or the global ones for `None`.
    fn list(
        &self,
        tenant_id: Option<Uuid>,
        pagination: Pagination,
    ) -> impl Future<Output = SentinelResult<PaginatedResult<Scope>>> + Send;
}

pub trait UserRepository: Send + Sync {
    fn create(&self, user: User) -> impl Future<Output = SentinelResult<User>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = SentinelResult<User>> + Send;
    /// `email` must already be normalized.
    fn find_by_email(
        &self,
        tenant_id: Uuid,
        email: &str,
    ) -> impl Future<Output = SentinelResult<Option<User>>> + Send;
    fn update(&self, user: User) -> impl Future<Output = SentinelResult<User>> + Send;
    fn count_by_tenant(&self, tenant_id: Uuid) -> impl Future<Output = SentinelResult<u64>> + Send;
    fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = SentinelResult<PaginatedResult<User>>> + Send;
}

pub trait VerificationTokenRepository: Send + Sync {
    fn create(
        &self,
        token: EmailVerificationToken,
    ) -> impl Future<Output = SentinelResult<EmailVerificationToken>> + Send;
    fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = SentinelResult<Option<EmailVerificationToken>>> + Send;
    /// Every token issued to the user, oldest first.
    fn find_by_user(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = SentinelResult<Vec<EmailVerificationToken>>> + Send;
    /// Atomically mark the token consumed and activate its user, but only
    /// if it is unconsumed and `now <= expires_at`.
    ///
    /// Returns the activated user to exactly one caller per token; every
    /// other caller, concurrent or later, gets `None`.
    fn consume_and_activate(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> impl Future<Output = SentinelResult<Option<User>>> + Send;
}
