//! SurrealDB repository implementations.

mod client;
mod scope;
mod tenant;
mod user;
mod verification_token;

pub use client::SurrealClientRepository;
pub use scope::SurrealScopeRepository;
pub use tenant::SurrealTenantRepository;
pub use user::SurrealUserRepository;
pub use verification_token::SurrealVerificationTokenRepository;

use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

impl CountRow {
    fn total(rows: Vec<CountRow>) -> u64 {
        rows.first().map(|r| r.total).unwrap_or(0)
    }
}

fn parse_uuid(entity: &str, field: &str, value: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::corrupt(entity, format!("invalid {field}: {e}")))
}
