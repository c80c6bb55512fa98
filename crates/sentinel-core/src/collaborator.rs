//! Interfaces of the external collaborators the core hands work to.
//!
//! The core never mints tokens and never talks SMTP. It supplies a verified
//! [`Principal`] to a [`TokenIssuer`], keeps the OAuth engine's own
//! application store in step through an [`ApplicationRegistry`], and hands
//! finished messages to an [`EmailSender`].

use serde::Serialize;
use uuid::Uuid;

use crate::error::SentinelResult;
use crate::models::client::{Client, ClientType};
use crate::models::principal::Principal;

/// OAuth/OIDC engine entry point for token issuance.
pub trait TokenIssuer: Send + Sync {
    /// Whatever the engine returns (token response, authorization code ...).
    type Response: Send;

    /// Failures must be reported as `SentinelError::OAuthEngine`.
    fn issue(
        &self,
        principal: Principal,
    ) -> impl Future<Output = SentinelResult<Self::Response>> + Send;
}

/// The OAuth engine's view of a client, derived from the core record.
/// Carries no secret material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationProjection {
    pub client_id: String,
    pub tenant_id: Uuid,
    pub display_name: String,
    pub client_type: ClientType,
    pub redirect_uris: Vec<String>,
    pub allowed_scopes: Vec<String>,
}

impl From<&Client> for ApplicationProjection {
    fn from(client: &Client) -> Self {
        Self {
            client_id: client.client_id().to_string(),
            tenant_id: client.tenant_id(),
            display_name: client.name().to_string(),
            client_type: client.client_type(),
            redirect_uris: client.redirect_uris().to_vec(),
            allowed_scopes: client.allowed_scopes().to_vec(),
        }
    }
}

/// The engine's application store. The core is the source of truth; this
/// store is a projection written after each successful core write.
pub trait ApplicationRegistry: Send + Sync {
    fn upsert(
        &self,
        application: ApplicationProjection,
    ) -> impl Future<Output = SentinelResult<()>> + Send;

    fn remove(
        &self,
        tenant_id: Uuid,
        client_id: &str,
    ) -> impl Future<Output = SentinelResult<()>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Outbound email transport. Failures must be `SentinelError::EmailDelivery`.
pub trait EmailSender: Send + Sync {
    fn send(&self, message: EmailMessage) -> impl Future<Output = SentinelResult<()>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_mirrors_client_without_secret() {
        let client = Client::new(Uuid::new_v4(), "svc", "Service", ClientType::Confidential)
            .unwrap()
            .with_secret_hash(Some("record".into()))
            .unwrap()
            .with_allowed_scopes(["read"])
            .unwrap();

        let projection = ApplicationProjection::from(&client);
        assert_eq!(projection.client_id, "svc");
        assert_eq!(projection.tenant_id, client.tenant_id());
        assert_eq!(projection.allowed_scopes, vec!["read".to_string()]);

        let json = serde_json::to_string(&projection).unwrap();
        assert!(!json.contains("record"));
    }
}
