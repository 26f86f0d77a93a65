//! Identity synchronization: mirror verified token claims into the local user table.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

use feedback_auth::{IdentityClaims, LocalUser};

use crate::{StoreError, UserStore};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The user exists locally and has been disabled.
    #[error("user account is inactive")]
    AccountDisabled,

    /// The store could not be reached; callers may continue on claims alone.
    #[error("identity sync failed: {0}")]
    Storage(#[from] StoreError),
}

/// Upsert the local user for `claims` and check that the account is enabled.
///
/// One storage round-trip. Repeated calls for the same subject never create a
/// second record; only email and name are refreshed.
pub async fn sync_user(store: &dyn UserStore, claims: &IdentityClaims, now: DateTime<Utc>) -> Result<LocalUser, SyncError> {
    let user = store.upsert_from_claims(claims, now).await?;
    if !user.is_active {
        debug!(user_id = %user.id, "rejecting disabled account");
        return Err(SyncError::AccountDisabled);
    }
    Ok(user)
}
