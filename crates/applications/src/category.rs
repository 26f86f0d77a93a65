use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use feedback_core::{ApplicationId, CategoryId, DomainError, DomainResult};

pub const DEFAULT_CATEGORY_COLOR: &str = "#3b82f6";

/// A feedback category scoped to one application. Names are unique per application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub application_id: ApplicationId,
    pub name: String,
    pub color: String,
    pub icon: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NewCategory {
    pub name: String,
    pub color: String,
    pub icon: String,
}

impl NewCategory {
    /// Validate and fill defaults.
    pub fn normalized(mut self) -> DomainResult<Self> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("Name is required"));
        }
        if self.color.trim().is_empty() {
            self.color = DEFAULT_CATEGORY_COLOR.to_string();
        }
        Ok(self)
    }
}
