//! Tenant resolution: map an opaque API key to an enabled application.

use thiserror::Error;

use feedback_core::ApplicationId;

use crate::{ApplicationStore, StoreError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TenantError {
    #[error("missing API key")]
    MissingCredential,

    #[error("unknown API key")]
    UnknownKey,

    #[error("application is inactive")]
    TenantDisabled,

    #[error("tenant lookup failed: {0}")]
    Storage(#[from] StoreError),
}

/// Resolve `api_key` to the owning application. Empty keys count as missing.
pub async fn resolve_tenant(store: &dyn ApplicationStore, api_key: Option<&str>) -> Result<ApplicationId, TenantError> {
    let api_key = api_key.filter(|k| !k.is_empty()).ok_or(TenantError::MissingCredential)?;

    let app = store
        .find_by_api_key(api_key)
        .await?
        .ok_or(TenantError::UnknownKey)?;

    if !app.is_active {
        return Err(TenantError::TenantDisabled);
    }
    Ok(app.id)
}
