//! Verified principal handed to the external OAuth/OIDC engine.

use serde::Serialize;
use uuid::Uuid;

/// Outcome of a successful authentication plus scope decision.
///
/// For the client-credentials grant `subject_id` is the client identifier;
/// for user-facing flows it is the user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub subject_id: String,
    pub client_id: String,
    pub tenant_id: Uuid,
    pub granted_scopes: Vec<String>,
}

impl Principal {
    /// Space-delimited scope string as it appears in OAuth responses.
    pub fn scope_string(&self) -> String {
        self.granted_scopes.join(" ")
    }
}
