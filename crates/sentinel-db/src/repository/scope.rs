//! SurrealDB implementation of [`ScopeRepository`].

use chrono::{DateTime, Utc};
use sentinel_core::error::SentinelResult;
use sentinel_core::models::scope::Scope;
use sentinel_core::repository::{PaginatedResult, Pagination, ScopeRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, parse_uuid};
use crate::error::DbError;

/// `tenant_key` value of global scopes.
const GLOBAL_KEY: &str = "*";

fn tenant_key(tenant_id: Option<Uuid>) -> String {
    tenant_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| GLOBAL_KEY.to_string())
}

#[derive(Debug, SurrealValue)]
struct ScopeRow {
    tenant_id: Option<String>,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ScopeRow {
    fn into_scope(self, id: Uuid) -> Result<Scope, DbError> {
        let tenant_id = self
            .tenant_id
            .as_deref()
            .map(|t| parse_uuid("scope", "tenant_id", t))
            .transpose()?;
        Scope::restore(
            id,
            tenant_id,
            &self.name,
            self.description.as_deref(),
            self.created_at,
            self.updated_at,
        )
        .map_err(|e| DbError::corrupt("scope", e))
    }
}

#[derive(Debug, SurrealValue)]
struct ScopeRowWithId {
    record_id: String,
    tenant_id: Option<String>,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ScopeRowWithId {
    fn try_into_scope(self) -> Result<Scope, DbError> {
        let id = parse_uuid("scope", "id", &self.record_id)?;
        ScopeRow {
            tenant_id: self.tenant_id,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_scope(id)
    }
}

/// SurrealDB implementation of the Scope repository.
#[derive(Clone)]
pub struct SurrealScopeRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealScopeRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ScopeRepository for SurrealScopeRepository<C> {
    async fn create(&self, scope: Scope) -> SentinelResult<Scope> {
        let id = scope.id();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('scope', $id) SET \
                 tenant_id = $tenant_id, tenant_key = $tenant_key, \
                 name = $name, description = $description, \
                 created_at = $created_at, updated_at = $updated_at",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", scope.tenant_id().map(|t| t.to_string())))
            .bind(("tenant_key", tenant_key(scope.tenant_id())))
            .bind(("name", scope.name().to_string()))
            .bind(("description", scope.description().map(str::to_string)))
            .bind(("created_at", scope.created_at()))
            .bind(("updated_at", scope.updated_at()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_write(e, "scope", "name"))?;

        let rows: Vec<ScopeRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "scope".into(),
            id: id_str,
        })?;

        Ok(row.into_scope(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> SentinelResult<Scope> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('scope', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ScopeRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "scope".into(),
            id: id_str,
        })?;

        Ok(row.into_scope(id)?)
    }

    async fn find_by_name(
        &self,
        tenant_id: Option<Uuid>,
        name: &str,
    ) -> SentinelResult<Option<Scope>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM scope \
                 WHERE tenant_key = $tenant_key AND name = $name",
            )
            .bind(("tenant_key", tenant_key(tenant_id)))
            .bind(("name", name.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ScopeRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(ScopeRowWithId::try_into_scope)
            .transpose()?)
    }

    async fn update(&self, scope: Scope) -> SentinelResult<Scope> {
        let id = scope.id();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "UPDATE type::record('scope', $id) SET \
                 tenant_id = $tenant_id, tenant_key = $tenant_key, \
                 name = $name, description = $description, \
                 updated_at = time::now()",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", scope.tenant_id().map(|t| t.to_string())))
            .bind(("tenant_key", tenant_key(scope.tenant_id())))
            .bind(("name", scope.name().to_string()))
            .bind(("description", scope.description().map(str::to_string)))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_write(e, "scope", "name"))?;

        let rows: Vec<ScopeRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "scope".into(),
            id: id_str,
        })?;

        Ok(row.into_scope(id)?)
    }

    async fn delete(&self, id: Uuid) -> SentinelResult<()> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("DELETE type::record('scope', $id) RETURN BEFORE")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ScopeRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(DbError::NotFound {
                entity: "scope".into(),
                id: id_str,
            }
            .into());
        }
        Ok(())
    }

    async fn list(
        &self,
        tenant_id: Option<Uuid>,
        pagination: Pagination,
    ) -> SentinelResult<PaginatedResult<Scope>> {
        let key = tenant_key(tenant_id);

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM scope \
                 WHERE tenant_key = $tenant_key GROUP ALL",
            )
            .bind(("tenant_key", key.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = CountRow::total(count_rows);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM scope \
                 WHERE tenant_key = $tenant_key \
                 ORDER BY name ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("tenant_key", key))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ScopeRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(ScopeRowWithId::try_into_scope)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
