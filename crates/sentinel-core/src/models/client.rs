//! OAuth client domain model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use super::scope::validate_scope_name;
use super::{require_id, require_non_blank};
use crate::error::{SentinelError, SentinelResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientType {
    /// Holds a secret; may use the client-credentials grant.
    Confidential,
    /// Cannot hold a secret (SPAs, native apps).
    Public,
}

impl ClientType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientType::Confidential => "Confidential",
            ClientType::Public => "Public",
        }
    }
}

impl fmt::Display for ClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClientType {
    type Err = SentinelError;

    /// Case-insensitive, so admin input like `"public"` is accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "confidential" => Ok(ClientType::Confidential),
            "public" => Ok(ClientType::Public),
            _ => Err(SentinelError::validation(
                "client_type",
                "invalid client type, use Confidential or Public",
            )),
        }
    }
}

/// Stored fields of a client, used to rehydrate it through
/// [`Client::restore`].
#[derive(Debug, Clone)]
pub struct ClientParts {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub client_id: String,
    pub name: String,
    pub client_type: ClientType,
    pub secret_hash: Option<String>,
    pub redirect_uris: Vec<String>,
    pub allowed_scopes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A registered OAuth principal owned by one tenant.
///
/// `(tenant_id, client_id)` is unique. A public client never holds a
/// secret hash; a confidential one needs one before it can use the
/// client-credentials grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Client {
    id: Uuid,
    tenant_id: Uuid,
    client_id: String,
    name: String,
    client_type: ClientType,
    #[serde(skip_serializing)]
    secret_hash: Option<String>,
    /// Deduplicated, insertion order preserved.
    redirect_uris: Vec<String>,
    /// Deduplicated, insertion order preserved.
    allowed_scopes: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Client {
    pub fn new(
        tenant_id: Uuid,
        client_id: &str,
        name: &str,
        client_type: ClientType,
    ) -> SentinelResult<Self> {
        let now = Utc::now();
        Self::restore(ClientParts {
            id: Uuid::new_v4(),
            tenant_id,
            client_id: client_id.to_string(),
            name: name.to_string(),
            client_type,
            secret_hash: None,
            redirect_uris: Vec::new(),
            allowed_scopes: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn restore(parts: ClientParts) -> SentinelResult<Self> {
        let client = Self {
            id: parts.id,
            tenant_id: require_id("tenant_id", parts.tenant_id)?,
            client_id: validate_client_id(&parts.client_id)?,
            name: require_non_blank("name", &parts.name)?,
            client_type: parts.client_type,
            secret_hash: None,
            redirect_uris: Vec::new(),
            allowed_scopes: Vec::new(),
            created_at: parts.created_at,
            updated_at: parts.updated_at,
        };
        client
            .with_secret_hash(parts.secret_hash)?
            .with_redirect_uris(parts.redirect_uris)?
            .with_allowed_scopes(parts.allowed_scopes)
    }

    /// Set or clear the secret hash. The hash must come from the secret
    /// hasher; public clients reject any hash.
    pub fn with_secret_hash(self, hash: Option<String>) -> SentinelResult<Self> {
        let hash = hash.filter(|h| !h.trim().is_empty());
        if self.client_type == ClientType::Public && hash.is_some() {
            return Err(SentinelError::validation(
                "client_secret",
                "public clients cannot have secrets",
            ));
        }
        Ok(Self {
            secret_hash: hash,
            updated_at: Utc::now(),
            ..self
        })
    }

    pub fn with_name(self, name: &str) -> SentinelResult<Self> {
        Ok(Self {
            name: require_non_blank("name", name)?,
            updated_at: Utc::now(),
            ..self
        })
    }

    /// Change the client type. Switching to public drops any secret hash.
    pub fn with_type(self, client_type: ClientType) -> Self {
        let secret_hash = match client_type {
            ClientType::Public => None,
            ClientType::Confidential => self.secret_hash,
        };
        Self {
            client_type,
            secret_hash,
            updated_at: Utc::now(),
            ..self
        }
    }

    /// Replace the redirect URIs. Each must be an absolute URL.
    pub fn with_redirect_uris<I, S>(self, uris: I) -> SentinelResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut redirect_uris: Vec<String> = Vec::new();
        for uri in uris {
            let uri = require_non_blank("redirect_uris", uri.as_ref())?;
            Url::parse(&uri).map_err(|e| {
                SentinelError::validation("redirect_uris", format!("invalid URI `{uri}`: {e}"))
            })?;
            push_unique(&mut redirect_uris, uri);
        }
        Ok(Self {
            redirect_uris,
            updated_at: Utc::now(),
            ..self
        })
    }

    /// Replace the allowed scope names.
    pub fn with_allowed_scopes<I, S>(self, scopes: I) -> SentinelResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut allowed_scopes: Vec<String> = Vec::new();
        for scope in scopes {
            push_unique(
                &mut allowed_scopes,
                validate_scope_name("allowed_scopes", scope.as_ref())?,
            );
        }
        Ok(Self {
            allowed_scopes,
            updated_at: Utc::now(),
            ..self
        })
    }

    /// A confidential client with a stored secret hash.
    pub fn can_use_client_credentials(&self) -> bool {
        self.client_type == ClientType::Confidential && self.secret_hash.is_some()
    }

    pub fn has_redirect_uri(&self, uri: &str) -> bool {
        self.redirect_uris.iter().any(|u| u == uri)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn client_type(&self) -> ClientType {
        self.client_type
    }

    pub fn secret_hash(&self) -> Option<&str> {
        self.secret_hash.as_deref()
    }

    pub fn redirect_uris(&self) -> &[String] {
        &self.redirect_uris
    }

    pub fn allowed_scopes(&self) -> &[String] {
        &self.allowed_scopes
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Client identifiers are sent in HTTP Basic credentials, which split on
/// the first colon, so they may contain neither colons nor whitespace.
fn validate_client_id(client_id: &str) -> SentinelResult<String> {
    let client_id = require_non_blank("client_id", client_id)?;
    if client_id.contains(':') || client_id.chars().any(char::is_whitespace) {
        return Err(SentinelError::validation(
            "client_id",
            "cannot contain colons or whitespace",
        ));
    }
    Ok(client_id)
}

fn push_unique(values: &mut Vec<String>, value: String) {
    if !values.contains(&value) {
        values.push(value);
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn confidential() -> Client {
        Client::new(
            Uuid::new_v4(),
            "billing-service",
            "Billing",
            ClientType::Confidential,
        )
        .unwrap()
    }

    #[test]
    fn client_type_parses_case_insensitively() {
        assert_eq!("public".parse::<ClientType>().unwrap(), ClientType::Public);
        assert_eq!(
            "CONFIDENTIAL".parse::<ClientType>().unwrap(),
            ClientType::Confidential
        );
        assert!("machine".parse::<ClientType>().is_err());
    }

    #[test]
    fn factory_requires_tenant_id_and_name() {
        assert!(Client::new(Uuid::nil(), "app", "App", ClientType::Public).is_err());
        assert!(Client::new(Uuid::new_v4(), "app", "  ", ClientType::Public).is_err());
        assert!(Client::new(Uuid::new_v4(), " ", "App", ClientType::Public).is_err());
    }

    #[test]
    fn client_id_cannot_contain_colon() {
        let err = Client::new(Uuid::new_v4(), "a:b", "App", ClientType::Public).unwrap_err();
        assert!(matches!(err, SentinelError::Validation { ref field, .. } if field == "client_id"));
    }

    #[test]
    fn public_client_rejects_secret_hash() {
        let client = Client::new(Uuid::new_v4(), "spa", "SPA", ClientType::Public).unwrap();
        assert!(client.with_secret_hash(Some("hash".into())).is_err());
    }

    #[test]
    fn confidential_client_needs_hash_for_client_credentials() {
        let client = confidential();
        assert!(!client.can_use_client_credentials());

        let client = client.with_secret_hash(Some("hash".into())).unwrap();
        assert!(client.can_use_client_credentials());
    }

    #[test]
    fn switching_to_public_clears_secret() {
        let client = confidential()
            .with_secret_hash(Some("hash".into()))
            .unwrap()
            .with_type(ClientType::Public);
        assert_eq!(client.client_type(), ClientType::Public);
        assert_eq!(client.secret_hash(), None);
    }

    #[test]
    fn redirect_uris_are_deduplicated_in_order() {
        let client = confidential()
            .with_redirect_uris([
                "https://b.example/cb",
                "https://a.example/cb",
                "https://b.example/cb",
            ])
            .unwrap();
        assert_eq!(
            client.redirect_uris(),
            ["https://b.example/cb", "https://a.example/cb"]
        );
    }

    #[test]
    fn relative_redirect_uri_is_rejected() {
        assert!(confidential().with_redirect_uris(["/callback"]).is_err());
    }

    #[test]
    fn scopes_are_deduplicated_and_case_sensitive() {
        let client = confidential()
            .with_allowed_scopes(["read", "Read", "read", "write"])
            .unwrap();
        assert_eq!(client.allowed_scopes(), ["read", "Read", "write"]);
    }

    #[test]
    fn restore_revalidates_stored_fields() {
        let now = Utc::now();
        let result = Client::restore(ClientParts {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            client_id: "spa".into(),
            name: "SPA".into(),
            client_type: ClientType::Public,
            secret_hash: Some("leaked".into()),
            redirect_uris: vec![],
            allowed_scopes: vec![],
            created_at: now,
            updated_at: now,
        });
        assert!(result.is_err());
    }

    #[test]
    fn secret_hash_is_not_serialized() {
        let client = confidential()
            .with_secret_hash(Some("pbkdf2-record".into()))
            .unwrap();
        let json = serde_json::to_string(&client).unwrap();
        assert!(!json.contains("pbkdf2-record"));
    }

    #[test]
    fn every_change_touches_updated_at() {
        let stale = Utc::now() - Duration::days(1);
        let client = || {
            Client::restore(ClientParts {
                id: Uuid::new_v4(),
                tenant_id: Uuid::new_v4(),
                client_id: "billing-service".into(),
                name: "Billing".into(),
                client_type: ClientType::Confidential,
                secret_hash: None,
                redirect_uris: vec![],
                allowed_scopes: vec![],
                created_at: stale,
                updated_at: stale,
            })
            .unwrap()
        };
        assert!(client().with_name("Renamed").unwrap().updated_at() > stale);
        assert!(client().with_type(ClientType::Public).updated_at() > stale);
        assert!(
            client()
                .with_redirect_uris(["https://app.example.com/cb"])
                .unwrap()
                .updated_at()
                > stale
        );
        assert!(client().with_allowed_scopes(["read"]).unwrap().updated_at() > stale);
        assert!(
            client()
                .with_secret_hash(Some("hash".into()))
                .unwrap()
                .updated_at()
                > stale
        );
    }
}
