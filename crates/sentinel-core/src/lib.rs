//! Sentinel Core: domain models, invariants, error taxonomy and the
//! collaborator traits (persistence, OAuth engine, email) the rest of
//! the workspace is written against.

pub mod collaborator;
pub mod error;
pub mod models;
pub mod repository;

pub use error::{SentinelError, SentinelResult};
