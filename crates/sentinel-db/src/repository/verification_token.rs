//! SurrealDB implementation of [`VerificationTokenRepository`].

use chrono::{DateTime, Utc};
use sentinel_core::error::SentinelResult;
use sentinel_core::models::user::User;
use sentinel_core::models::verification_token::EmailVerificationToken;
use sentinel_core::repository::VerificationTokenRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::parse_uuid;
use super::user::UserRow;
use crate::error::DbError;

/// Claims the token and activates its owner in one transaction. The
/// `consumed_at = NONE` guard lets exactly one claim nonce through.
const CONSUME_AND_ACTIVATE: &str = "\
BEGIN TRANSACTION;
UPDATE verification_token SET consumed_at = $now, consumed_by = $claim \
    WHERE token_hash = $token_hash AND consumed_at = NONE AND expires_at >= $now;
UPDATE user SET is_active = true, updated_at = time::now() \
    WHERE meta::id(id) IN \
    (SELECT VALUE user_id FROM verification_token WHERE consumed_by = $claim);
COMMIT TRANSACTION;
";

#[derive(Debug, SurrealValue)]
struct VerificationTokenRow {
    user_id: String,
    token_hash: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    consumed_at: Option<DateTime<Utc>>,
}

impl VerificationTokenRow {
    fn into_token(self, id: Uuid) -> Result<EmailVerificationToken, DbError> {
        EmailVerificationToken::restore(
            id,
            parse_uuid("verification_token", "user_id", &self.user_id)?,
            &self.token_hash,
            self.expires_at,
            self.created_at,
            self.consumed_at,
        )
        .map_err(|e| DbError::corrupt("verification_token", e))
    }
}

#[derive(Debug, SurrealValue)]
struct VerificationTokenRowWithId {
    record_id: String,
    user_id: String,
    token_hash: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    consumed_at: Option<DateTime<Utc>>,
}

impl VerificationTokenRowWithId {
    fn try_into_token(self) -> Result<EmailVerificationToken, DbError> {
        let id = parse_uuid("verification_token", "id", &self.record_id)?;
        VerificationTokenRow {
            user_id: self.user_id,
            token_hash: self.token_hash,
            expires_at: self.expires_at,
            created_at: self.created_at,
            consumed_at: self.consumed_at,
        }
        .into_token(id)
    }
}

/// SurrealDB implementation of the verification token repository.
#[derive(Clone)]
pub struct SurrealVerificationTokenRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealVerificationTokenRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn claimed_user(&self, claim: &str) -> Result<Option<User>, DbError> {
        let mut result = self
            .db
            .query("SELECT VALUE user_id FROM verification_token WHERE consumed_by = $claim")
            .bind(("claim", claim.to_string()))
            .await?;
        let user_ids: Vec<String> = result.take(0)?;
        let Some(user_id) = user_ids.into_iter().next() else {
            return Ok(None);
        };

        let id = parse_uuid("verification_token", "user_id", &user_id)?;
        let mut result = self
            .db
            .query("SELECT * FROM type::record('user', $id)")
            .bind(("id", user_id.clone()))
            .await?;
        let rows: Vec<UserRow> = result.take(0)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: user_id,
        })?;
        row.into_user(id).map(Some)
    }
}

impl<C: Connection> VerificationTokenRepository for SurrealVerificationTokenRepository<C> {
    async fn create(&self, token: EmailVerificationToken) -> SentinelResult<EmailVerificationToken> {
        let id = token.id();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('verification_token', $id) SET \
                 user_id = $user_id, token_hash = $token_hash, \
                 expires_at = $expires_at, created_at = $created_at",
            )
            .bind(("id", id_str.clone()))
            .bind(("user_id", token.user_id().to_string()))
            .bind(("token_hash", token.token_hash().to_string()))
            .bind(("expires_at", token.expires_at()))
            .bind(("created_at", token.created_at()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_write(e, "verification_token", "token_hash"))?;

        let rows: Vec<VerificationTokenRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "verification_token".into(),
            id: id_str,
        })?;

        Ok(row.into_token(id)?)
    }

    async fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> SentinelResult<Option<EmailVerificationToken>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM verification_token \
                 WHERE token_hash = $token_hash",
            )
            .bind(("token_hash", token_hash.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<VerificationTokenRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(VerificationTokenRowWithId::try_into_token)
            .transpose()?)
    }

    async fn find_by_user(&self, user_id: Uuid) -> SentinelResult<Vec<EmailVerificationToken>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM verification_token \
                 WHERE user_id = $user_id ORDER BY created_at ASC",
            )
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<VerificationTokenRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(VerificationTokenRowWithId::try_into_token)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn consume_and_activate(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> SentinelResult<Option<User>> {
        let claim = Uuid::new_v4().to_string();

        let result = self
            .db
            .query(CONSUME_AND_ACTIVATE)
            .bind(("now", now))
            .bind(("claim", claim.clone()))
            .bind(("token_hash", token_hash.to_string()))
            .await;

        let outcome = match result {
            Ok(response) => response.check().map(|_| ()),
            Err(e) => Err(e),
        };
        if let Err(e) = outcome {
            // A losing writer surfaces as a failed transaction whose wording
            // varies by engine. The stored token decides the outcome.
            let consumed = self
                .find_by_token_hash(token_hash)
                .await?
                .is_some_and(|token| token.consumed_at().is_some());
            if consumed {
                debug!("verification token claimed by a concurrent request");
                return Ok(None);
            }
            return Err(DbError::Query(e.to_string()).into());
        }

        Ok(self.claimed_user(&claim).await?)
    }
}
