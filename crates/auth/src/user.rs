//! Local user record mirrored from the identity provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use feedback_core::UserId;

use crate::{IdentityClaims, Role};

/// A user known to this service.
///
/// # Invariants
/// - `id` equals the token subject and never changes.
/// - `is_admin` and `is_active` are managed locally; synchronization from
///   token claims only refreshes `email` and `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalUser {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub is_admin: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LocalUser {
    /// Record for a subject seen for the first time: active, not an admin.
    pub fn first_seen(claims: &IdentityClaims, now: DateTime<Utc>) -> Self {
        Self {
            id: claims.subject,
            email: claims.email.clone(),
            name: claims.name.clone(),
            is_admin: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn refresh_profile(&mut self, claims: &IdentityClaims, now: DateTime<Utc>) {
        self.email = claims.email.clone();
        self.name = claims.name.clone();
        self.updated_at = now;
    }

    pub fn role(&self) -> Role {
        if self.is_admin { Role::Admin } else { Role::User }
    }
}
