//! SurrealDB implementation of [`ClientRepository`].

use chrono::{DateTime, Utc};
use sentinel_core::error::SentinelResult;
use sentinel_core::models::client::{Client, ClientParts, ClientType};
use sentinel_core::repository::{ClientRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ClientRow {
    tenant_id: String,
    client_id: String,
    name: String,
    client_type: String,
    secret_hash: Option<String>,
    redirect_uris: Vec<String>,
    allowed_scopes: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ClientRow {
    fn into_client(self, id: Uuid) -> Result<Client, DbError> {
        let client_type: ClientType = self
            .client_type
            .parse()
            .map_err(|e| DbError::corrupt("client", e))?;
        Client::restore(ClientParts {
            id,
            tenant_id: parse_uuid("client", "tenant_id", &self.tenant_id)?,
            client_id: self.client_id,
            name: self.name,
            client_type,
            secret_hash: self.secret_hash,
            redirect_uris: self.redirect_uris,
            allowed_scopes: self.allowed_scopes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
        .map_err(|e| DbError::corrupt("client", e))
    }
}

#[derive(Debug, SurrealValue)]
struct ClientRowWithId {
    record_id: String,
    tenant_id: String,
    client_id: String,
    name: String,
    client_type: String,
    secret_hash: Option<String>,
    redirect_uris: Vec<String>,
    allowed_scopes: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ClientRowWithId {
    fn try_into_client(self) -> Result<Client, DbError> {
        let id = parse_uuid("client", "id", &self.record_id)?;
        ClientRow {
            tenant_id: self.tenant_id,
            client_id: self.client_id,
            name: self.name,
            client_type: self.client_type,
            secret_hash: self.secret_hash,
            redirect_uris: self.redirect_uris,
            allowed_scopes: self.allowed_scopes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_client(id)
    }
}

#[derive(Debug, SurrealValue)]
struct AllowedScopesRow {
    allowed_scopes: Vec<String>,
}

/// SurrealDB implementation of the Client repository.
#[derive(Clone)]
pub struct SurrealClientRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealClientRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ClientRepository for SurrealClientRepository<C> {
    async fn create(&self, client: Client) -> SentinelResult<Client> {
        let id = client.id();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('client', $id) SET \
                 tenant_id = $tenant_id, client_id = $client_id, \
                 name = $name, client_type = $client_type, \
                 secret_hash = $secret_hash, \
                 redirect_uris = $redirect_uris, \
                 allowed_scopes = $allowed_scopes, \
                 created_at = $created_at, updated_at = $updated_at",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", client.tenant_id().to_string()))
            .bind(("client_id", client.client_id().to_string()))
            .bind(("name", client.name().to_string()))
            .bind(("client_type", client.client_type().as_str()))
            .bind(("secret_hash", client.secret_hash().map(str::to_string)))
            .bind(("redirect_uris", client.redirect_uris().to_vec()))
            .bind(("allowed_scopes", client.allowed_scopes().to_vec()))
            .bind(("created_at", client.created_at()))
            .bind(("updated_at", client.updated_at()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_write(e, "client", "client_id"))?;

        let rows: Vec<ClientRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "client".into(),
            id: id_str,
        })?;

        Ok(row.into_client(id)?)
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> SentinelResult<Client> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('client', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ClientRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "client".into(),
            id: id_str,
        })?;

        Ok(row.into_client(id)?)
    }

    async fn find_by_client_id(
        &self,
        tenant_id: Uuid,
        client_id: &str,
    ) -> SentinelResult<Option<Client>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM client \
                 WHERE tenant_id = $tenant_id AND client_id = $client_id",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("client_id", client_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ClientRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(ClientRowWithId::try_into_client)
            .transpose()?)
    }

    async fn find_all_by_client_id(&self, client_id: &str) -> SentinelResult<Vec<Client>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM client \
                 WHERE client_id = $client_id",
            )
            .bind(("client_id", client_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ClientRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(ClientRowWithId::try_into_client)
            .collect::<Result<Vec<_>, DbError>>()?)
    }

    async fn update(&self, client: Client) -> SentinelResult<Client> {
        let id = client.id();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "UPDATE type::record('client', $id) SET \
                 client_id = $client_id, name = $name, \
                 client_type = $client_type, secret_hash = $secret_hash, \
                 redirect_uris = $redirect_uris, \
                 allowed_scopes = $allowed_scopes, \
                 updated_at = time::now() \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", client.tenant_id().to_string()))
            .bind(("client_id", client.client_id().to_string()))
            .bind(("name", client.name().to_string()))
            .bind(("client_type", client.client_type().as_str()))
            .bind(("secret_hash", client.secret_hash().map(str::to_string)))
            .bind(("redirect_uris", client.redirect_uris().to_vec()))
            .bind(("allowed_scopes", client.allowed_scopes().to_vec()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_write(e, "client", "client_id"))?;

        let rows: Vec<ClientRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "client".into(),
            id: id_str,
        })?;

        Ok(row.into_client(id)?)
    }

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> SentinelResult<()> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "DELETE type::record('client', $id) \
                 WHERE tenant_id = $tenant_id RETURN BEFORE",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ClientRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(DbError::NotFound {
                entity: "client".into(),
                id: id_str,
            }
            .into());
        }
        Ok(())
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> SentinelResult<PaginatedResult<Client>> {
        let tenant_id_str = tenant_id.to_string();
        let total = self.count_by_tenant(tenant_id).await?;

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM client \
                 WHERE tenant_id = $tenant_id \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("tenant_id", tenant_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ClientRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(ClientRowWithId::try_into_client)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn count_by_tenant(&self, tenant_id: Uuid) -> SentinelResult<u64> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM client \
                 WHERE tenant_id = $tenant_id GROUP ALL",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(CountRow::total(rows))
    }

    async fn any_references_scope(
        &self,
        tenant_id: Option<Uuid>,
        scope_name: &str,
    ) -> SentinelResult<bool> {
        let mut result = match tenant_id {
            Some(tenant_id) => {
                self.db
                    .query("SELECT allowed_scopes FROM client WHERE tenant_id = $tenant_id")
                    .bind(("tenant_id", tenant_id.to_string()))
                    .await
            }
            None => self.db.query("SELECT allowed_scopes FROM client").await,
        }
        .map_err(DbError::from)?;

        let rows: Vec<AllowedScopesRow> = result.take(0).map_err(DbError::from)?;
        let needle = scope_name.to_lowercase();
        Ok(rows
            .iter()
            .flat_map(|row| row.allowed_scopes.iter())
            .any(|scope| scope.to_lowercase() == needle))
    }
}
