//! Client-credentials grant transport: form fields and the Basic header.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;

use crate::error::AuthError;

pub const CLIENT_CREDENTIALS_GRANT: &str = "client_credentials";

/// A token endpoint request: the form body plus the raw `Authorization`
/// header value, if any.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenRequest {
    pub grant_type: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Space-delimited scope names.
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(skip)]
    pub authorization: Option<String>,
}

/// Identifier and secret as presented by the caller, not yet verified.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: Option<String>,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "***"))
            .finish()
    }
}

impl TokenRequest {
    /// Body credentials win; the Basic header is only consulted when the
    /// body carries no client identifier.
    pub fn credentials(&self) -> Result<ClientCredentials, AuthError> {
        let body_client_id = self
            .client_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty());
        if let Some(client_id) = body_client_id {
            return Ok(ClientCredentials {
                client_id: client_id.to_string(),
                client_secret: self.client_secret.clone(),
            });
        }
        let header = self
            .authorization
            .as_deref()
            .ok_or(AuthError::MalformedCredentials)?;
        parse_basic_authorization(header)
    }

    /// Requested scopes in first-seen order, duplicates dropped.
    pub fn requested_scopes(&self) -> Vec<String> {
        parse_scope_param(self.scope.as_deref().unwrap_or_default())
    }
}

/// Decode `Basic base64(id:secret)`. The secret may itself contain colons.
pub fn parse_basic_authorization(header: &str) -> Result<ClientCredentials, AuthError> {
    let header = header.trim();
    let (scheme, payload) = header
        .split_once(' ')
        .ok_or(AuthError::MalformedCredentials)?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return Err(AuthError::MalformedCredentials);
    }
    let decoded = STANDARD
        .decode(payload.trim())
        .map_err(|_| AuthError::MalformedCredentials)?;
    let decoded = String::from_utf8(decoded).map_err(|_| AuthError::MalformedCredentials)?;
    let (client_id, secret) = decoded
        .split_once(':')
        .ok_or(AuthError::MalformedCredentials)?;
    if client_id.is_empty() {
        return Err(AuthError::MalformedCredentials);
    }
    Ok(ClientCredentials {
        client_id: client_id.to_string(),
        client_secret: Some(secret.to_string()),
    })
}

pub fn parse_scope_param(scope: &str) -> Vec<String> {
    let mut scopes: Vec<String> = Vec::new();
    for name in scope.split_whitespace() {
        if !scopes.iter().any(|s| s == name) {
            scopes.push(name.to_string());
        }
    }
    scopes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic(raw: &str) -> String {
        format!("Basic {}", STANDARD.encode(raw))
    }

    fn request() -> TokenRequest {
        TokenRequest {
            grant_type: CLIENT_CREDENTIALS_GRANT.into(),
            ..TokenRequest::default()
        }
    }

    #[test]
    fn body_credentials_take_precedence() {
        let req = TokenRequest {
            client_id: Some("body-client".into()),
            client_secret: Some("body-secret".into()),
            authorization: Some(basic("header-client:header-secret")),
            ..request()
        };
        let creds = req.credentials().unwrap();
        assert_eq!(creds.client_id, "body-client");
        assert_eq!(creds.client_secret.as_deref(), Some("body-secret"));
    }

    #[test]
    fn falls_back_to_basic_header() {
        let req = TokenRequest {
            client_id: Some("   ".into()),
            authorization: Some(basic("svc:pa:ss")),
            ..request()
        };
        let creds = req.credentials().unwrap();
        assert_eq!(creds.client_id, "svc");
        assert_eq!(creds.client_secret.as_deref(), Some("pa:ss"));
    }

    #[test]
    fn scheme_is_case_insensitive() {
        let header = format!("bAsIc   {}  ", STANDARD.encode("svc:secret"));
        assert_eq!(
            parse_basic_authorization(&header).unwrap().client_id,
            "svc"
        );
    }

    #[test]
    fn malformed_headers_fail() {
        let no_colon = basic("svc");
        let empty_id = basic(":secret");
        let bad_utf8 = format!("Basic {}", STANDARD.encode([0xff, 0xfe, b':']));
        for header in [
            "",
            "Bearer abc",
            "Basic",
            "Basic !!!not-base64!!!",
            no_colon.as_str(),
            empty_id.as_str(),
            bad_utf8.as_str(),
        ] {
            assert!(
                parse_basic_authorization(header).is_err(),
                "accepted {header:?}"
            );
        }
    }

    #[test]
    fn missing_credentials_fail() {
        assert!(matches!(
            request().credentials(),
            Err(AuthError::MalformedCredentials)
        ));
    }

    #[test]
    fn scope_param_is_split_and_deduplicated() {
        assert_eq!(
            parse_scope_param("  read write read  Write "),
            vec!["read", "write", "Write"]
        );
        assert!(parse_scope_param("   ").is_empty());
    }

    #[test]
    fn secret_is_redacted_in_debug_output() {
        let creds = ClientCredentials {
            client_id: "svc".into(),
            client_secret: Some("hunter2".into()),
        };
        assert!(!format!("{creds:?}").contains("hunter2"));
    }
}
