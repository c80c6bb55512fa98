//! Authorization-code consent decision.
//!
//! Code minting and PKCE stay with the OAuth engine. This only decides
//! whether a signed-in user may grant a client the requested scopes at the
//! given redirect URI.

use sentinel_core::error::{SentinelError, SentinelResult};
use sentinel_core::models::principal::Principal;
use sentinel_core::repository::ClientRepository;
use tracing::{debug, info};

use crate::error::AuthError;
use crate::scope::ScopeAuthorizer;
use crate::user_auth::AuthenticatedUser;

pub struct ConsentService<C: ClientRepository> {
    clients: C,
    scopes: ScopeAuthorizer,
}

impl<C: ClientRepository> ConsentService<C> {
    pub fn new(clients: C) -> Self {
        Self {
            clients,
            scopes: ScopeAuthorizer,
        }
    }

    /// The client must belong to the user's tenant and list `redirect_uri`
    /// exactly. Requested scopes go through the usual all-or-nothing check
    /// against the client's allowed set.
    pub async fn authorize(
        &self,
        user: &AuthenticatedUser,
        client_id: &str,
        redirect_uri: &str,
        requested_scopes: &[String],
    ) -> SentinelResult<Principal> {
        let Some(client) = self
            .clients
            .find_by_client_id(user.tenant_id, client_id.trim())
            .await?
        else {
            return Err(reject(client_id, AuthError::UnknownClient));
        };
        if !client.has_redirect_uri(redirect_uri) {
            return Err(reject(client_id, AuthError::RedirectUriMismatch));
        }
        let granted_scopes = self
            .scopes
            .authorize(requested_scopes, client.allowed_scopes())
            .map_err(|cause| reject(client_id, cause))?;

        info!(
            tenant_id = %user.tenant_id,
            user_id = %user.user_id,
            client_id = %client.client_id(),
            "consent granted"
        );
        Ok(Principal {
            subject_id: user.user_id.to_string(),
            client_id: client.client_id().to_string(),
            tenant_id: user.tenant_id,
            granted_scopes,
        })
    }
}

fn reject(client_id: &str, cause: AuthError) -> SentinelError {
    debug!(client_id = %client_id, cause = %cause, "consent rejected");
    cause.into()
}
