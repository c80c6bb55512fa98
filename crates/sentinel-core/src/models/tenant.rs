//! Tenant domain model.
//!
//! Tenants are the identity boundary: every client, user and tenant-scoped
//! scope belongs to exactly one tenant by reference.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::require_non_blank;
use crate::error::{SentinelError, SentinelResult};

/// Normalize a tenant slug: trim, lowercase, spaces become hyphens.
///
/// Applied before both the uniqueness check and the stored value, so
/// `"Acme Corp"` and `"acme-corp"` collide.
pub fn normalize_slug(slug: &str) -> String {
    slug.trim().to_lowercase().replace(' ', "-")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tenant {
    id: Uuid,
    name: String,
    /// Globally unique, always stored normalized.
    slug: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Tenant {
    /// Create a new tenant with a fresh id.
    pub fn new(name: &str, slug: &str) -> SentinelResult<Self> {
        let now = Utc::now();
        Self::restore(Uuid::new_v4(), name, slug, now, now)
    }

    /// Rebuild a tenant from stored fields, re-checking invariants.
    pub fn restore(
        id: Uuid,
        name: &str,
        slug: &str,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> SentinelResult<Self> {
        Ok(Self {
            id,
            name: require_non_blank("name", name)?,
            slug: validated_slug(slug)?,
            created_at,
            updated_at,
        })
    }

    /// Return the tenant with a new name and slug.
    pub fn renamed(self, name: &str, slug: &str) -> SentinelResult<Self> {
        Ok(Self {
            name: require_non_blank("name", name)?,
            slug: validated_slug(slug)?,
            updated_at: Utc::now(),
            ..self
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

fn validated_slug(slug: &str) -> SentinelResult<String> {
    let normalized = normalize_slug(slug);
    if normalized.is_empty() {
        return Err(SentinelError::validation("slug", "is required"));
    }
    Ok(normalized)
}
