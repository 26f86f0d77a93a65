use serde::{Deserialize, Serialize};

use feedback_core::UserId;

use crate::{IdentityClaims, LocalUser, Role};

/// Identity of the caller for the duration of one request.
///
/// Derived from verified claims plus the local user record; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPrincipal {
    pub user_id: UserId,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl SessionPrincipal {
    /// Without a local record (degraded sync) the caller is a plain user.
    pub fn resolve(claims: &IdentityClaims, local: Option<&LocalUser>) -> Self {
        Self {
            user_id: claims.subject,
            email: claims.email.clone(),
            name: claims.name.clone(),
            role: local.map(LocalUser::role).unwrap_or(Role::User),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Per-instance ownership: authors may modify their own records, admins anything.
    pub fn can_modify(&self, author: UserId) -> bool {
        self.is_admin() || self.user_id == author
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn claims() -> IdentityClaims {
        IdentityClaims {
            subject: UserId::new(),
            email: "p@example.com".into(),
            name: "P".into(),
        }
    }

    #[test]
    fn admin_flag_yields_admin_role() {
        let c = claims();
        let mut local = LocalUser::first_seen(&c, Utc::now());
        local.is_admin = true;
        let principal = SessionPrincipal::resolve(&c, Some(&local));
        assert_eq!(principal.role, Role::Admin);
        assert!(principal.can_modify(UserId::new()));
    }

    #[test]
    fn degraded_sync_falls_back_to_user() {
        let c = claims();
        let principal = SessionPrincipal::resolve(&c, None);
        assert_eq!(principal.role, Role::User);
        assert!(principal.can_modify(c.subject));
        assert!(!principal.can_modify(UserId::new()));
    }
}
