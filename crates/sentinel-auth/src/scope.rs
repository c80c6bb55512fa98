//! Scope authorization: requested scopes against an allowed set.

use tracing::debug;

use crate::error::AuthError;

/// Pure set-membership decision with no side effects.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScopeAuthorizer;

impl ScopeAuthorizer {
    /// Grant the requested scopes, or fail as a whole.
    ///
    /// An empty request grants everything in `allowed`. Otherwise every
    /// requested name must appear in `allowed` exactly (case-sensitive);
    /// one stray name rejects the whole request. Duplicates collapse and
    /// the result keeps the order in which names were first seen.
    pub fn authorize<R, A>(&self, requested: &[R], allowed: &[A]) -> Result<Vec<String>, AuthError>
    where
        R: AsRef<str>,
        A: AsRef<str>,
    {
        let source: Vec<&str> = if requested.is_empty() {
            allowed.iter().map(AsRef::as_ref).collect()
        } else {
            let requested: Vec<&str> = requested.iter().map(AsRef::as_ref).collect();
            if let Some(denied) = requested
                .iter()
                .find(|r| !allowed.iter().any(|a| a.as_ref() == **r))
            {
                debug!(scope = %denied, "requested scope not allowed");
                return Err(AuthError::ScopeNotAllowed);
            }
            requested
        };

        let mut granted: Vec<String> = Vec::with_capacity(source.len());
        for name in source {
            if !granted.iter().any(|g| g == name) {
                granted.push(name.to_string());
            }
        }
        Ok(granted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(mut v: Vec<String>) -> Vec<String> {
        v.sort();
        v
    }

    #[test]
    fn grants_requested_subset() {
        let granted = ScopeAuthorizer
            .authorize(&["a", "b"], &["a", "b", "c"])
            .unwrap();
        assert_eq!(granted, vec!["a", "b"]);
    }

    #[test]
    fn any_unknown_scope_rejects_everything() {
        let result = ScopeAuthorizer.authorize(&["a", "z"], &["a", "b"]);
        assert!(matches!(result, Err(AuthError::ScopeNotAllowed)));
    }

    #[test]
    fn empty_request_grants_full_allowed_set() {
        let none: [&str; 0] = [];
        let granted = ScopeAuthorizer.authorize(&none, &["a", "b"]).unwrap();
        assert_eq!(granted, vec!["a", "b"]);
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert!(ScopeAuthorizer.authorize(&["Read"], &["read"]).is_err());
    }

    #[test]
    fn order_does_not_change_the_granted_set() {
        let allowed = ["a", "b", "c"];
        let one = ScopeAuthorizer.authorize(&["c", "a"], &allowed).unwrap();
        let two = ScopeAuthorizer.authorize(&["a", "c", "a"], &allowed).unwrap();
        assert_eq!(sorted(one), sorted(two));
    }

    #[test]
    fn empty_allowed_set_with_empty_request_grants_nothing() {
        let none: [&str; 0] = [];
        assert!(ScopeAuthorizer.authorize(&none, &none).unwrap().is_empty());
    }
}
