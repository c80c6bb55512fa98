//! Shared setup and collaborator fakes for the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use sentinel_auth::config::HasherConfig;
use sentinel_auth::hasher::SecretHasher;
use sentinel_auth::registry::TenantRegistry;
use sentinel_core::SentinelError;
use sentinel_core::collaborator::{
    ApplicationProjection, ApplicationRegistry, EmailMessage, EmailSender, TokenIssuer,
};
use sentinel_core::error::SentinelResult;
use sentinel_core::models::principal::Principal;
use sentinel_db::repository::{
    SurrealClientRepository, SurrealScopeRepository, SurrealTenantRepository,
    SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use url::Url;
use uuid::Uuid;

pub type Registry = TenantRegistry<
    SurrealTenantRepository<Db>,
    SurrealClientRepository<Db>,
    SurrealScopeRepository<Db>,
    SurrealUserRepository<Db>,
    RecordingApplications,
>;

/// Spin up an in-memory DB with the schema applied.
pub async fn setup_db() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    sentinel_db::run_migrations(&db).await.unwrap();
    db
}

pub fn hasher() -> Arc<SecretHasher> {
    Arc::new(SecretHasher::new(HasherConfig::default()).unwrap())
}

pub fn registry(db: &Surreal<Db>, applications: RecordingApplications) -> Registry {
    TenantRegistry::new(
        SurrealTenantRepository::new(db.clone()),
        SurrealClientRepository::new(db.clone()),
        SurrealScopeRepository::new(db.clone()),
        SurrealUserRepository::new(db.clone()),
        applications,
        hasher(),
        6,
    )
}

// -----------------------------------------------------------------------
// Token issuer
// -----------------------------------------------------------------------

/// Hands the principal straight back and counts calls.
#[derive(Clone, Default)]
pub struct RecordingIssuer {
    calls: Arc<AtomicUsize>,
    fail: Arc<AtomicBool>,
}

impl RecordingIssuer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

impl TokenIssuer for RecordingIssuer {
    type Response = Principal;

    async fn issue(&self, principal: Principal) -> SentinelResult<Principal> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(SentinelError::Internal("signing key unavailable".into()));
        }
        Ok(principal)
    }
}

// -----------------------------------------------------------------------
// Application registry
// -----------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct RecordingApplications {
    upserts: Arc<Mutex<Vec<ApplicationProjection>>>,
    removals: Arc<Mutex<Vec<(Uuid, String)>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingApplications {
    pub fn upserts(&self) -> Vec<ApplicationProjection> {
        self.upserts.lock().unwrap().clone()
    }

    pub fn removals(&self) -> Vec<(Uuid, String)> {
        self.removals.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> SentinelResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SentinelError::OAuthEngine("application store offline".into()));
        }
        Ok(())
    }
}

impl ApplicationRegistry for RecordingApplications {
    async fn upsert(&self, application: ApplicationProjection) -> SentinelResult<()> {
        self.check()?;
        self.upserts.lock().unwrap().push(application);
        Ok(())
    }

    async fn remove(&self, tenant_id: Uuid, client_id: &str) -> SentinelResult<()> {
        self.check()?;
        self.removals
            .lock()
            .unwrap()
            .push((tenant_id, client_id.to_string()));
        Ok(())
    }
}

// -----------------------------------------------------------------------
// Email
// -----------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct CapturingEmail {
    sent: Arc<Mutex<Vec<EmailMessage>>>,
    fail: Arc<AtomicBool>,
}

impl CapturingEmail {
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    /// The `token` query parameter of the link in the latest message.
    pub fn last_token(&self) -> String {
        let sent = self.sent();
        let message = sent.last().expect("no email was sent");
        let link = message
            .body
            .split_whitespace()
            .find(|word| word.starts_with("http"))
            .expect("no link in email body");
        let url = Url::parse(link).unwrap();
        url.query_pairs()
            .find(|(key, _)| key == "token")
            .map(|(_, value)| value.into_owned())
            .expect("no token in link")
    }
}

impl EmailSender for CapturingEmail {
    async fn send(&self, message: EmailMessage) -> SentinelResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SentinelError::EmailDelivery("smtp relay refused".into()));
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}
