use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use feedback_core::{ApplicationId, DomainError, DomainResult};

use crate::ApiKey;

/// A registered application (tenant).
///
/// # Invariants
/// - `slug` is unique across applications.
/// - `api_key` is unique and only ever replaced wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub api_key: ApiKey,
    pub is_active: bool,
    pub webhook_url: Option<String>,
    pub allowed_origins: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Command: register a new application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NewApplication {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub webhook_url: Option<String>,
    pub allowed_origins: Vec<String>,
}

impl NewApplication {
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() || self.slug.trim().is_empty() {
            return Err(DomainError::validation("Name and slug are required"));
        }
        Ok(())
    }

    /// Build the record for a validated command. New applications start active.
    pub fn into_application(self, api_key: ApiKey, now: DateTime<Utc>) -> DomainResult<Application> {
        self.validate()?;
        Ok(Application {
            id: ApplicationId::new(),
            name: self.name,
            slug: self.slug,
            description: self.description,
            api_key,
            is_active: true,
            webhook_url: self.webhook_url,
            allowed_origins: self.allowed_origins,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Command: partial update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ApplicationPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub webhook_url: Option<String>,
    pub allowed_origins: Option<Vec<String>>,
}

impl ApplicationPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.is_active.is_none()
            && self.webhook_url.is_none()
            && self.allowed_origins.is_none()
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.is_empty() {
            return Err(DomainError::validation("No fields to update"));
        }
        if matches!(&self.name, Some(name) if name.trim().is_empty()) {
            return Err(DomainError::validation("Name cannot be empty"));
        }
        Ok(())
    }

    pub fn apply_to(&self, app: &mut Application, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            app.name = name.clone();
        }
        if let Some(description) = &self.description {
            app.description = description.clone();
        }
        if let Some(is_active) = self.is_active {
            app.is_active = is_active;
        }
        if let Some(webhook_url) = &self.webhook_url {
            app.webhook_url = Some(webhook_url.clone());
        }
        if let Some(origins) = &self.allowed_origins {
            app.allowed_origins = origins.clone();
        }
        app.updated_at = now;
    }
}
