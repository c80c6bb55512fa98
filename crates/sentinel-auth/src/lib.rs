//! Sentinel Auth: secret hashing, client authentication, scope
//! authorization, tenant administration and email verification.

pub mod client_credentials;
pub mod config;
pub mod consent;
pub mod credentials;
pub mod email;
pub mod error;
pub mod hasher;
pub mod registration;
pub mod registry;
pub mod scope;
pub mod user_auth;
pub mod verification;

pub use client_credentials::{
    AuthenticatedClient, ClientCredentialValidator, ClientCredentialsGrant,
};
pub use config::{AuthConfig, HashAlgorithm, HasherConfig};
pub use consent::ConsentService;
pub use credentials::TokenRequest;
pub use error::{AuthError, TokenError};
pub use hasher::SecretHasher;
pub use registration::{RegisterInput, RegistrationService};
pub use registry::TenantRegistry;
pub use scope::ScopeAuthorizer;
pub use user_auth::{AuthenticatedUser, UserAuthenticator};
pub use verification::{IssuedToken, VerificationTokenManager};
