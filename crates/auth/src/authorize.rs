use thiserror::Error;

use crate::{PolicyTable, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: {role} may not {method} {path}")]
    Forbidden {
        role: Role,
        method: String,
        path: String,
    },
}

/// Authorize a role for a resource path and HTTP method.
///
/// - No IO
/// - No panics
/// - Deny unless a rule matches
pub fn authorize(policy: &PolicyTable, role: Role, path: &str, method: &str) -> Result<(), AuthzError> {
    if policy.allows(role, path, method) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden {
            role,
            method: method.to_string(),
            path: path.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deny_carries_the_request_for_logging() {
        let policy = PolicyTable::embedded().unwrap();
        let err = authorize(&policy, Role::User, "/api/v1/applications", "GET").unwrap_err();
        assert_eq!(err.to_string(), "forbidden: user may not GET /api/v1/applications");
        assert!(authorize(&policy, Role::Admin, "/api/v1/applications", "GET").is_ok());
    }
}
