//! Sentinel database layer: SurrealDB connection management, schema
//! migrations and implementations of the `sentinel-core` repository traits.

mod connection;
mod error;
pub mod repository;
mod schema;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use repository::{
    SurrealClientRepository, SurrealScopeRepository, SurrealTenantRepository,
    SurrealUserRepository, SurrealVerificationTokenRepository,
};
pub use schema::{latest_version, run_migrations};
