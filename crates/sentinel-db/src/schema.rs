//! Schema definitions and migration runner for SurrealDB.
//!
//! Tables are SCHEMAFULL. UUIDs are stored as strings and used as record
//! keys. Unique indexes are the final authority on every uniqueness rule;
//! application-side guards only produce the friendlier error first.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct AppliedVersion {
    version: u32,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "identity_core",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Tenants (global scope)
-- =======================================================================
DEFINE TABLE tenant SCHEMAFULL;
DEFINE FIELD name ON TABLE tenant TYPE string;
DEFINE FIELD slug ON TABLE tenant TYPE string ASSERT $value != '';
DEFINE FIELD created_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_tenant_slug ON TABLE tenant COLUMNS slug UNIQUE;

-- =======================================================================
-- Clients (tenant-scoped)
-- =======================================================================
DEFINE TABLE client SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE client TYPE string;
DEFINE FIELD client_id ON TABLE client TYPE string;
DEFINE FIELD name ON TABLE client TYPE string;
DEFINE FIELD client_type ON TABLE client TYPE string \
    ASSERT $value IN ['Confidential', 'Public'];
DEFINE FIELD secret_hash ON TABLE client TYPE option<string>;
DEFINE FIELD redirect_uris ON TABLE client TYPE array<string> DEFAULT [];
DEFINE FIELD allowed_scopes ON TABLE client TYPE array<string> DEFAULT [];
DEFINE FIELD created_at ON TABLE client TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE client TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_client_tenant_client_id ON TABLE client \
    COLUMNS tenant_id, client_id UNIQUE;
DEFINE INDEX idx_client_client_id ON TABLE client COLUMNS client_id;

-- =======================================================================
-- Scopes (global when tenant_id is NONE)
-- =======================================================================
-- tenant_key is the tenant id or '*' for global scopes, so one unique
-- index covers both namespaces.
DEFINE TABLE scope SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE scope TYPE option<string>;
DEFINE FIELD tenant_key ON TABLE scope TYPE string;
DEFINE FIELD name ON TABLE scope TYPE string;
DEFINE FIELD description ON TABLE scope TYPE option<string>;
DEFINE FIELD created_at ON TABLE scope TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE scope TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_scope_tenant_name ON TABLE scope \
    COLUMNS tenant_key, name UNIQUE;

-- =======================================================================
-- Users (tenant-scoped)
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE user TYPE string;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD password_hash ON TABLE user TYPE string \
    ASSERT string::len($value) > 0;
DEFINE FIELD is_active ON TABLE user TYPE bool DEFAULT true;
DEFINE FIELD is_admin ON TABLE user TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_tenant_email ON TABLE user \
    COLUMNS tenant_id, email UNIQUE;

-- =======================================================================
-- Email verification tokens (owned by a user)
-- =======================================================================
DEFINE TABLE verification_token SCHEMAFULL;
DEFINE FIELD user_id ON TABLE verification_token TYPE string;
DEFINE FIELD token_hash ON TABLE verification_token TYPE string;
DEFINE FIELD expires_at ON TABLE verification_token TYPE datetime;
DEFINE FIELD created_at ON TABLE verification_token TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD consumed_at ON TABLE verification_token \
    TYPE option<datetime>;
DEFINE FIELD consumed_by ON TABLE verification_token \
    TYPE option<string>;
DEFINE INDEX idx_verification_token_hash ON TABLE verification_token \
    COLUMNS token_hash UNIQUE;
DEFINE INDEX idx_verification_token_user ON TABLE verification_token \
    COLUMNS user_id;

DEFINE EVENT user_tokens_cascade ON TABLE user WHEN $event = 'DELETE' \
    THEN (DELETE verification_token WHERE user_id = meta::id($before.id));
";

/// Run all pending schema migrations.
///
/// Idempotent: versions already recorded in `_migration` are skipped.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT version FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let applied: Vec<AppliedVersion> = result.take(0)?;
    let current_version = applied.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS
        .iter()
        .filter(|m| m.version > current_version)
    {
        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        db.query(migration.sql).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "v{} '{}' failed: {}",
                migration.version, migration.name, e,
            ))
        })?;

        db.query("CREATE _migration SET version = $version, name = $name")
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "failed to record v{}: {}",
                    migration.version, e,
                ))
            })?;
    }

    Ok(())
}

/// Latest schema version known to this build.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}
