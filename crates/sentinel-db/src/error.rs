//! Database-specific error types and conversions.

use sentinel_core::error::SentinelError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    /// A unique index rejected the write.
    #[error("Duplicate {entity}: {field} already taken")]
    Duplicate { entity: String, field: String },

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    /// A stored row no longer satisfies the domain invariants.
    #[error("Corrupt {entity} row: {message}")]
    Corrupt { entity: String, message: String },
}

impl DbError {
    /// Classify a failed statement. Unique index violations become
    /// [`DbError::Duplicate`] so callers see the same conflict a guard
    /// would have reported.
    pub(crate) fn from_write(err: surrealdb::Error, entity: &str, field: &str) -> Self {
        let message = err.to_string();
        if is_unique_violation(&message) {
            DbError::Duplicate {
                entity: entity.into(),
                field: field.into(),
            }
        } else {
            DbError::Query(message)
        }
    }

    pub(crate) fn corrupt(entity: &str, message: impl std::fmt::Display) -> Self {
        DbError::Corrupt {
            entity: entity.into(),
            message: message.to_string(),
        }
    }
}

/// SurrealDB reports unique index violations as
/// "Database index `idx_...` already contains ...".
fn is_unique_violation(message: &str) -> bool {
    message.contains("already contains")
}

impl From<DbError> for SentinelError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => SentinelError::NotFound { entity, id },
            DbError::Duplicate { entity, field } => SentinelError::AlreadyExists { entity, field },
            other => SentinelError::Database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_message_is_recognised() {
        assert!(is_unique_violation(
            "Database index `idx_tenant_slug` already contains 'acme', with record `tenant:x`"
        ));
        assert!(!is_unique_violation("Found NONE for field `name`"));
    }

    #[test]
    fn duplicates_map_to_already_exists() {
        let err: SentinelError = DbError::Duplicate {
            entity: "tenant".into(),
            field: "slug".into(),
        }
        .into();
        assert!(matches!(err, SentinelError::AlreadyExists { .. }));
    }

    #[test]
    fn other_failures_are_dependency_failures() {
        let err: SentinelError = DbError::Query("connection reset".into()).into();
        assert!(err.is_dependency_failure());
        let err: SentinelError = DbError::corrupt("user", "bad uuid").into();
        assert!(err.is_dependency_failure());
    }
}
