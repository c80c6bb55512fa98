//! Integration tests for self-registration, email verification, password
//! sign-in and the consent decision.

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use sentinel_auth::config::AuthConfig;
use sentinel_auth::consent::ConsentService;
use sentinel_auth::registration::{RegisterInput, RegistrationService};
use sentinel_auth::registry::{CreateClient, CreateTenant, CreateUser};
use sentinel_auth::user_auth::UserAuthenticator;
use sentinel_auth::verification::VerificationTokenManager;
use sentinel_core::SentinelError;
use sentinel_core::models::client::ClientType;
use sentinel_core::repository::UserRepository;
use sentinel_db::repository::{
    SurrealClientRepository, SurrealTenantRepository, SurrealUserRepository,
    SurrealVerificationTokenRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use uuid::Uuid;

use common::{CapturingEmail, RecordingApplications, Registry};

type Registration = RegistrationService<
    SurrealTenantRepository<Db>,
    SurrealUserRepository<Db>,
    SurrealVerificationTokenRepository<Db>,
    CapturingEmail,
>;

struct Fixture {
    db: Surreal<Db>,
    registry: Registry,
    registration: Registration,
    email: CapturingEmail,
    tenant_id: Uuid,
}

async fn fixture_with(config: AuthConfig) -> Fixture {
    let db = common::setup_db().await;
    let registry = common::registry(&db, RecordingApplications::default());
    let tenant = registry
        .create_tenant(CreateTenant {
            name: "Acme".into(),
            slug: "acme".into(),
        })
        .await
        .unwrap();

    let email = CapturingEmail::default();
    let registration = RegistrationService::new(
        SurrealTenantRepository::new(db.clone()),
        SurrealUserRepository::new(db.clone()),
        VerificationTokenManager::new(SurrealVerificationTokenRepository::new(db.clone())),
        email.clone(),
        common::hasher(),
        config,
    );

    Fixture {
        db,
        registry,
        registration,
        email,
        tenant_id: tenant.id(),
    }
}

async fn fixture() -> Fixture {
    fixture_with(AuthConfig::default()).await
}

fn input(email: &str) -> RegisterInput {
    RegisterInput {
        tenant_slug: "acme".into(),
        email: email.into(),
        password: "correct-horse".into(),
        confirm_password: "correct-horse".into(),
    }
}

fn authenticator(db: &Surreal<Db>) -> UserAuthenticator<SurrealUserRepository<Db>> {
    UserAuthenticator::new(SurrealUserRepository::new(db.clone()), common::hasher())
}

// -----------------------------------------------------------------------
// Registration and verification
// -----------------------------------------------------------------------

#[tokio::test]
async fn registered_user_is_inactive_until_verified_once() {
    let f = fixture().await;

    let user = f.registration.register(input("new@acme.test")).await.unwrap();
    assert!(!user.is_active());
    assert_eq!(user.tenant_id(), f.tenant_id);

    let sent = f.email.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "new@acme.test");
    assert!(sent[0].body.contains("/account/verify?token="));

    let token = f.email.last_token();
    let verified = f.registration.verify(&token).await.unwrap();
    assert_eq!(verified.id(), user.id());
    assert!(verified.is_active());

    let err = f.registration.verify(&token).await.unwrap_err();
    assert!(matches!(err, SentinelError::InvalidToken), "got {err:?}");
}

#[tokio::test]
async fn unknown_or_blank_token_is_invalid() {
    let f = fixture().await;

    for token in ["", "   ", "not-a-real-token"] {
        let err = f.registration.verify(token).await.unwrap_err();
        assert!(matches!(err, SentinelError::InvalidToken), "got {err:?}");
    }
}

#[tokio::test]
async fn expired_token_does_not_activate() {
    let f = fixture().await;
    let user = f.registration.register(input("late@acme.test")).await.unwrap();

    let manager = VerificationTokenManager::new(SurrealVerificationTokenRepository::new(
        f.db.clone(),
    ));
    let issued_at = Utc::now() - Duration::hours(2);
    let issued = manager
        .issue_at(user.id(), Duration::hours(1), issued_at)
        .await
        .unwrap();

    let err = manager.consume(&issued.token, Utc::now()).await.unwrap_err();
    assert!(matches!(err, SentinelError::InvalidToken), "got {err:?}");

    let reloaded = SurrealUserRepository::new(f.db.clone())
        .get_by_id(f.tenant_id, user.id())
        .await
        .unwrap();
    assert!(!reloaded.is_active());
}

#[tokio::test]
async fn token_is_valid_up_to_its_expiry_instant() {
    let f = fixture().await;
    let user = f.registration.register(input("edge@acme.test")).await.unwrap();

    let manager = VerificationTokenManager::new(SurrealVerificationTokenRepository::new(
        f.db.clone(),
    ));
    let issued = manager
        .issue_at(user.id(), Duration::hours(1), Utc::now())
        .await
        .unwrap();

    let activated = manager
        .consume(&issued.token, issued.expires_at)
        .await
        .unwrap();
    assert!(activated.is_active());
}

#[tokio::test]
async fn registration_input_is_validated() {
    let f = fixture().await;

    let err = f
        .registration
        .register(RegisterInput {
            confirm_password: "something-else".into(),
            ..input("a@acme.test")
        })
        .await
        .unwrap_err();
    assert!(
        matches!(err, SentinelError::Validation { ref field, .. } if field == "confirm_password")
    );

    let err = f
        .registration
        .register(RegisterInput {
            tenant_slug: "globex".into(),
            ..input("a@acme.test")
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SentinelError::Validation { ref field, .. } if field == "tenant_slug"));

    let err = f
        .registration
        .register(input("not-an-email"))
        .await
        .unwrap_err();
    assert!(matches!(err, SentinelError::Validation { ref field, .. } if field == "email"));

    assert!(f.email.sent().is_empty());
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let f = fixture().await;

    f.registration.register(input("dup@acme.test")).await.unwrap();
    let err = f
        .registration
        .register(input("DUP@acme.test"))
        .await
        .unwrap_err();
    assert!(matches!(err, SentinelError::AlreadyExists { .. }), "got {err:?}");
}

#[tokio::test]
async fn verification_can_be_disabled() {
    let f = fixture_with(AuthConfig {
        require_email_verification: false,
        ..AuthConfig::default()
    })
    .await;

    let user = f.registration.register(input("open@acme.test")).await.unwrap();
    assert!(user.is_active());
    assert!(f.email.sent().is_empty());
}

#[tokio::test]
async fn failed_delivery_can_be_recovered_with_a_resend() {
    let f = fixture().await;
    f.email.set_failing(true);

    let err = f
        .registration
        .register(input("bounce@acme.test"))
        .await
        .unwrap_err();
    assert!(matches!(err, SentinelError::EmailDelivery(_)), "got {err:?}");
    assert!(f.email.sent().is_empty());

    // The address stays taken by the pending account.
    f.email.set_failing(false);
    let err = f
        .registration
        .register(input("bounce@acme.test"))
        .await
        .unwrap_err();
    assert!(matches!(err, SentinelError::AlreadyExists { .. }), "got {err:?}");

    f.registration
        .resend_verification("acme", "Bounce@acme.test")
        .await
        .unwrap();
    assert_eq!(f.email.sent().len(), 1);

    let verified = f.registration.verify(&f.email.last_token()).await.unwrap();
    assert_eq!(verified.email(), "bounce@acme.test");
    assert!(verified.is_active());

    // Settled now: further resends send nothing.
    f.registration
        .resend_verification("acme", "bounce@acme.test")
        .await
        .unwrap();
    assert_eq!(f.email.sent().len(), 1);
}

#[tokio::test]
async fn resend_ignores_accounts_not_awaiting_verification() {
    let f = fixture().await;
    f.registry
        .create_user(CreateUser {
            tenant_id: f.tenant_id,
            email: "suspended@acme.test".into(),
            password: "correct-horse".into(),
            is_active: false,
            is_admin: false,
        })
        .await
        .unwrap();

    for email in ["suspended@acme.test", "nobody@acme.test"] {
        f.registration
            .resend_verification("acme", email)
            .await
            .unwrap();
    }
    assert!(f.email.sent().is_empty());

    let err = f
        .registration
        .resend_verification("globex", "suspended@acme.test")
        .await
        .unwrap_err();
    assert!(matches!(err, SentinelError::Validation { ref field, .. } if field == "tenant_slug"));
}

#[tokio::test]
async fn out_of_range_lifetime_is_a_validation_error() {
    let f = fixture().await;
    let manager = VerificationTokenManager::new(SurrealVerificationTokenRepository::new(
        f.db.clone(),
    ));

    let err = manager
        .issue(Uuid::new_v4(), Duration::seconds(i64::MAX / 1000))
        .await
        .unwrap_err();
    assert!(matches!(err, SentinelError::Validation { ref field, .. } if field == "lifetime"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_verifications_activate_once() {
    let f = fixture().await;
    let user = f.registration.register(input("race@acme.test")).await.unwrap();
    let token = f.email.last_token();

    let manager = Arc::new(VerificationTokenManager::new(
        SurrealVerificationTokenRepository::new(f.db.clone()),
    ));
    let handles: Vec<_> = (0..12)
        .map(|_| {
            let manager = Arc::clone(&manager);
            let token = token.clone();
            tokio::spawn(async move { manager.consume(&token, Utc::now()).await })
        })
        .collect();

    let mut activated = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(verified) => {
                assert_eq!(verified.id(), user.id());
                activated += 1;
            }
            Err(err) => assert!(matches!(err, SentinelError::InvalidToken), "got {err:?}"),
        }
    }
    assert_eq!(activated, 1);
}

// -----------------------------------------------------------------------
// Password sign-in
// -----------------------------------------------------------------------

#[tokio::test]
async fn sign_in_requires_verified_account_and_correct_password() {
    let f = fixture().await;
    let auth = authenticator(&f.db);
    f.registration.register(input("user@acme.test")).await.unwrap();

    let err = auth
        .authenticate(f.tenant_id, "user@acme.test", "correct-horse")
        .await
        .unwrap_err();
    assert!(matches!(err, SentinelError::AuthenticationFailed), "got {err:?}");

    f.registration.verify(&f.email.last_token()).await.unwrap();

    let signed_in = auth
        .authenticate(f.tenant_id, "USER@acme.test", "correct-horse")
        .await
        .unwrap();
    assert_eq!(signed_in.email, "user@acme.test");
    assert_eq!(signed_in.tenant_id, f.tenant_id);

    for (email, password) in [
        ("user@acme.test", "wrong-horse"),
        ("user@acme.test", ""),
        ("nobody@acme.test", "correct-horse"),
    ] {
        let err = auth
            .authenticate(f.tenant_id, email, password)
            .await
            .unwrap_err();
        assert!(matches!(err, SentinelError::AuthenticationFailed), "got {err:?}");
    }

    let err = auth
        .authenticate(Uuid::new_v4(), "user@acme.test", "correct-horse")
        .await
        .unwrap_err();
    assert!(matches!(err, SentinelError::AuthenticationFailed));
}

// -----------------------------------------------------------------------
// Consent
// -----------------------------------------------------------------------

#[tokio::test]
async fn consent_checks_redirect_uri_and_scopes() {
    let f = fixture().await;
    let auth = authenticator(&f.db);
    f.registration.register(input("user@acme.test")).await.unwrap();
    f.registration.verify(&f.email.last_token()).await.unwrap();
    let user = auth
        .authenticate(f.tenant_id, "user@acme.test", "correct-horse")
        .await
        .unwrap();

    f.registry
        .create_client(CreateClient {
            tenant_id: f.tenant_id,
            client_id: "portal".into(),
            name: "Portal".into(),
            client_type: ClientType::Public,
            client_secret: None,
            redirect_uris: vec!["https://portal.acme.test/callback".into()],
            allowed_scopes: vec!["openid".into(), "profile".into()],
        })
        .await
        .unwrap();

    let consent = ConsentService::new(SurrealClientRepository::new(f.db.clone()));
    let principal = consent
        .authorize(
            &user,
            "portal",
            "https://portal.acme.test/callback",
            &["openid".to_string()],
        )
        .await
        .unwrap();
    assert_eq!(principal.subject_id, user.user_id.to_string());
    assert_eq!(principal.client_id, "portal");
    assert_eq!(principal.granted_scopes, vec!["openid".to_string()]);

    let err = consent
        .authorize(
            &user,
            "portal",
            "https://evil.example.com/callback",
            &["openid".to_string()],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SentinelError::AuthenticationFailed));

    let err = consent
        .authorize(
            &user,
            "portal",
            "https://portal.acme.test/callback",
            &["admin".to_string()],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SentinelError::AuthenticationFailed));

    let err = consent
        .authorize(&user, "unknown", "https://portal.acme.test/callback", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, SentinelError::AuthenticationFailed));
}
