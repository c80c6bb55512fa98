//! Client authentication for the client-credentials grant.
//!
//! Every failure is the same opaque `AuthenticationFailed`. The concrete
//! cause only goes to the debug log.

use std::sync::Arc;

use sentinel_core::collaborator::TokenIssuer;
use sentinel_core::error::{SentinelError, SentinelResult};
use sentinel_core::models::client::{Client, ClientType};
use sentinel_core::models::principal::Principal;
use sentinel_core::repository::ClientRepository;
use tracing::{debug, info};
use uuid::Uuid;

use crate::credentials::{CLIENT_CREDENTIALS_GRANT, TokenRequest};
use crate::error::AuthError;
use crate::hasher::SecretHasher;
use crate::scope::ScopeAuthorizer;

/// A client whose secret and requested scopes both checked out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedClient {
    pub client_id: String,
    pub tenant_id: Uuid,
    pub granted_scopes: Vec<String>,
}

impl From<AuthenticatedClient> for Principal {
    fn from(client: AuthenticatedClient) -> Self {
        Principal {
            subject_id: client.client_id.clone(),
            client_id: client.client_id,
            tenant_id: client.tenant_id,
            granted_scopes: client.granted_scopes,
        }
    }
}

pub struct ClientCredentialValidator<C: ClientRepository> {
    clients: C,
    hasher: Arc<SecretHasher>,
    scopes: ScopeAuthorizer,
}

impl<C: ClientRepository> ClientCredentialValidator<C> {
    pub fn new(clients: C, hasher: Arc<SecretHasher>) -> Self {
        Self {
            clients,
            hasher,
            scopes: ScopeAuthorizer,
        }
    }

    /// Authenticate a confidential client and authorize its scopes.
    ///
    /// Storage failures propagate as `Database`; everything else is
    /// `AuthenticationFailed`.
    pub async fn authenticate(
        &self,
        client_id: &str,
        secret: Option<&str>,
        requested_scopes: &[String],
    ) -> SentinelResult<AuthenticatedClient> {
        let secret = secret.unwrap_or_default();
        let client = match self.lookup(client_id).await? {
            Ok(client) => client,
            Err(cause) => {
                self.hasher.verify_dummy(secret);
                return Err(reject(client_id, cause));
            }
        };

        if let Err(cause) = self.check_secret(&client, secret) {
            return Err(reject(client_id, cause));
        }

        let granted_scopes = self
            .scopes
            .authorize(requested_scopes, client.allowed_scopes())
            .map_err(|cause| reject(client_id, cause))?;

        info!(
            tenant_id = %client.tenant_id(),
            client_id = %client.client_id(),
            "client authenticated"
        );
        Ok(AuthenticatedClient {
            client_id: client.client_id().to_string(),
            tenant_id: client.tenant_id(),
            granted_scopes,
        })
    }

    /// Resolve a client by identifier across all tenants. An identifier
    /// shared by several tenants cannot be attributed and fails closed.
    async fn lookup(&self, client_id: &str) -> SentinelResult<Result<Client, AuthError>> {
        let mut matches = self.clients.find_all_by_client_id(client_id).await?;
        Ok(match matches.len() {
            0 => Err(AuthError::UnknownClient),
            1 => Ok(matches.remove(0)),
            _ => Err(AuthError::AmbiguousClient),
        })
    }

    /// Exactly one key derivation runs on every path through here.
    fn check_secret(&self, client: &Client, secret: &str) -> Result<(), AuthError> {
        let record = match client.secret_hash() {
            Some(record) if client.can_use_client_credentials() => record,
            _ => {
                self.hasher.verify_dummy(secret);
                return Err(match client.client_type() {
                    ClientType::Public => AuthError::PublicClient,
                    ClientType::Confidential => AuthError::MissingSecret,
                });
            }
        };
        if secret.is_empty() {
            self.hasher.verify_dummy(secret);
            return Err(AuthError::SecretMismatch);
        }
        if !self.hasher.verify(secret, record) {
            return Err(AuthError::SecretMismatch);
        }
        Ok(())
    }
}

fn reject(client_id: &str, cause: AuthError) -> SentinelError {
    debug!(client_id = %client_id, cause = %cause, "client authentication rejected");
    cause.into()
}

/// The client-credentials grant: extract, authenticate, authorize, and only
/// then hand the principal to the token issuer.
pub struct ClientCredentialsGrant<C: ClientRepository, I: TokenIssuer> {
    validator: ClientCredentialValidator<C>,
    issuer: I,
}

impl<C: ClientRepository, I: TokenIssuer> ClientCredentialsGrant<C, I> {
    pub fn new(validator: ClientCredentialValidator<C>, issuer: I) -> Self {
        Self { validator, issuer }
    }

    pub async fn exchange(&self, request: &TokenRequest) -> SentinelResult<I::Response> {
        if request.grant_type != CLIENT_CREDENTIALS_GRANT {
            debug!(grant_type = %request.grant_type, "unsupported grant type");
            return Err(AuthError::UnsupportedGrantType.into());
        }
        let credentials = request.credentials().map_err(|cause| {
            debug!(cause = %cause, "client credentials could not be extracted");
            SentinelError::from(cause)
        })?;

        let client = self
            .validator
            .authenticate(
                &credentials.client_id,
                credentials.client_secret.as_deref(),
                &request.requested_scopes(),
            )
            .await?;

        self.issuer
            .issue(Principal::from(client))
            .await
            .map_err(|e| match e {
                SentinelError::OAuthEngine(_) => e,
                other => SentinelError::OAuthEngine(other.to_string()),
            })
    }
}
