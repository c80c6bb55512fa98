//! Scope domain model.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::require_non_blank;
use crate::error::{SentinelError, SentinelResult};

/// Validate a scope name and return its trimmed form.
///
/// Scope names travel space-delimited in token requests, so they may not
/// contain whitespace. Matching is exact and case-sensitive everywhere.
pub fn validate_scope_name(field: &str, name: &str) -> SentinelResult<String> {
    let name = require_non_blank(field, name)?;
    if name.chars().any(char::is_whitespace) {
        return Err(SentinelError::validation(
            field,
            "scope names cannot contain whitespace",
        ));
    }
    Ok(name)
}

/// A named permission, either global (`tenant_id` is `None`) or owned by
/// a single tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scope {
    id: Uuid,
    tenant_id: Option<Uuid>,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Scope {
    pub fn new(
        name: &str,
        description: Option<&str>,
        tenant_id: Option<Uuid>,
    ) -> SentinelResult<Self> {
        let now = Utc::now();
        Self::restore(Uuid::new_v4(), tenant_id, name, description, now, now)
    }

    pub fn restore(
        id: Uuid,
        tenant_id: Option<Uuid>,
        name: &str,
        description: Option<&str>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> SentinelResult<Self> {
        Ok(Self {
            id,
            tenant_id: checked_tenant(tenant_id)?,
            name: validate_scope_name("name", name)?,
            description: clean_description(description),
            created_at,
            updated_at,
        })
    }

    /// Replace name, description and owning tenant in one step.
    pub fn updated(
        self,
        name: &str,
        description: Option<&str>,
        tenant_id: Option<Uuid>,
    ) -> SentinelResult<Self> {
        Ok(Self {
            tenant_id: checked_tenant(tenant_id)?,
            name: validate_scope_name("name", name)?,
            description: clean_description(description),
            updated_at: Utc::now(),
            ..self
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn tenant_id(&self) -> Option<Uuid> {
        self.tenant_id
    }

    pub fn is_global(&self) -> bool {
        self.tenant_id.is_none()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

fn checked_tenant(tenant_id: Option<Uuid>) -> SentinelResult<Option<Uuid>> {
    match tenant_id {
        Some(id) if id.is_nil() => Err(SentinelError::validation(
            "tenant_id",
            "must be a real tenant id or absent for a global scope",
        )),
        other => Ok(other),
    }
}

fn clean_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_and_tenant_scopes() {
        let global = Scope::new("read:reports", None, None).unwrap();
        assert!(global.is_global());

        let tenant = Uuid::new_v4();
        let owned = Scope::new("read:reports", Some("Reports"), Some(tenant)).unwrap();
        assert_eq!(owned.tenant_id(), Some(tenant));
        assert_eq!(owned.description(), Some("Reports"));
    }

    #[test]
    fn name_is_trimmed_and_case_preserved() {
        let scope = Scope::new("  Orders.Read ", None, None).unwrap();
        assert_eq!(scope.name(), "Orders.Read");
    }

    #[test]
    fn whitespace_inside_name_is_rejected() {
        assert!(Scope::new("read reports", None, None).is_err());
        assert!(Scope::new("", None, None).is_err());
    }

    #[test]
    fn blank_description_becomes_none() {
        let scope = Scope::new("api", Some("   "), None).unwrap();
        assert_eq!(scope.description(), None);
    }

    #[test]
    fn nil_tenant_is_rejected() {
        assert!(Scope::new("api", None, Some(Uuid::nil())).is_err());
    }

    #[test]
    fn update_can_move_scope_to_global() {
        let scope = Scope::new("api", None, Some(Uuid::new_v4())).unwrap();
        let id = scope.id();
        let updated = scope.updated("api:v2", Some("v2"), None).unwrap();
        assert_eq!(updated.id(), id);
        assert!(updated.is_global());
        assert_eq!(updated.name(), "api:v2");
    }
}
