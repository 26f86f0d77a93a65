use feedback_core::ApplicationId;

pub use feedback_auth::SessionPrincipal;

/// Tenant context for a public request.
///
/// Inserted by the API-key gate; immutable for the rest of the request.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TenantContext {
    application_id: ApplicationId,
}

impl TenantContext {
    pub fn new(application_id: ApplicationId) -> Self {
        Self { application_id }
    }

    pub fn application_id(&self) -> ApplicationId {
        self.application_id
    }
}
