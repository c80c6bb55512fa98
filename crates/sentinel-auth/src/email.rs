//! Verification email content.

use sentinel_core::collaborator::EmailMessage;
use url::Url;

use crate::config::AuthConfig;

/// Verification link: the configured page with `token` as a query parameter.
pub fn verification_link(base_url: &str, token: &str) -> String {
    match Url::parse(base_url) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair("token", token);
            url.to_string()
        }
        Err(_) => format!("{base_url}?token={token}"),
    }
}

pub fn verification_email(config: &AuthConfig, to: &str, token: &str) -> EmailMessage {
    let link = verification_link(&config.verification_base_url, token);
    EmailMessage {
        to: to.to_string(),
        subject: config.email_subject.clone(),
        body: format!(
            "Welcome!\n\nPlease confirm your email address by opening the link below:\n\n{link}\n\n\
             If you did not create an account you can ignore this message."
        ),
    }
}
