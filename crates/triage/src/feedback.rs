use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use feedback_core::{ApplicationId, CategoryId, DomainError, DomainResult, FeedbackId, UserId};

use crate::status::{FeedbackStatus, Priority, StatusStamp};

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

/// A feedback submission, always owned by exactly one application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: FeedbackId,
    pub application_id: ApplicationId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<i32>,
    pub status: FeedbackStatus,
    pub priority: Priority,
    pub page_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser_info: Option<Value>,
    pub app_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    pub contact_email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Command: an end user submits feedback through a tenant's API key.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SubmitFeedback {
    pub category_id: Option<CategoryId>,
    pub title: String,
    pub content: String,
    pub rating: Option<i32>,
    pub page_url: String,
    pub browser_info: Option<Value>,
    pub app_version: String,
    pub metadata: Option<Value>,
    pub contact_email: String,
}

impl SubmitFeedback {
    pub fn validate(&self) -> DomainResult<()> {
        if self.content.trim().is_empty() {
            return Err(DomainError::validation("Content is required"));
        }
        if let Some(rating) = self.rating {
            if !(MIN_RATING..=MAX_RATING).contains(&rating) {
                return Err(DomainError::validation("Rating must be between 1 and 5"));
            }
        }
        Ok(())
    }

    /// New submissions start as `new` / `medium`.
    pub fn into_feedback(
        self,
        application_id: ApplicationId,
        user_id: Option<UserId>,
        now: DateTime<Utc>,
    ) -> DomainResult<Feedback> {
        self.validate()?;
        Ok(Feedback {
            id: FeedbackId::new(),
            application_id,
            user_id,
            category_id: self.category_id,
            title: self.title,
            content: self.content,
            rating: self.rating,
            status: FeedbackStatus::New,
            priority: Priority::Medium,
            page_url: self.page_url,
            browser_info: self.browser_info.filter(|v| !v.is_null()),
            app_version: self.app_version,
            metadata: self.metadata.filter(|v| !v.is_null()),
            contact_email: self.contact_email,
            created_at: now,
            updated_at: now,
            reviewed_at: None,
            resolved_at: None,
        })
    }
}

/// Command: triage update. Absent fields are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedbackPatch {
    pub status: Option<FeedbackStatus>,
    pub priority: Option<Priority>,
    pub category_id: Option<CategoryId>,
}

impl FeedbackPatch {
    /// Parse the textual workflow values sent by clients.
    pub fn parse(
        status: Option<&str>,
        priority: Option<&str>,
        category_id: Option<CategoryId>,
    ) -> DomainResult<Self> {
        let patch = Self {
            status: status.map(str::parse).transpose()?,
            priority: priority.map(str::parse).transpose()?,
            category_id,
        };
        if patch.is_empty() {
            return Err(DomainError::validation("No fields to update"));
        }
        Ok(patch)
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.priority.is_none() && self.category_id.is_none()
    }

    /// Timestamp column this patch stamps, if any.
    pub fn stamp(&self) -> Option<StatusStamp> {
        self.status.and_then(|s| s.stamp())
    }

    pub fn apply_to(&self, feedback: &mut Feedback, now: DateTime<Utc>) {
        if let Some(status) = self.status {
            feedback.status = status;
        }
        match self.stamp() {
            Some(StatusStamp::Reviewed) => feedback.reviewed_at = Some(now),
            Some(StatusStamp::Resolved) => feedback.resolved_at = Some(now),
            None => {}
        }
        if let Some(priority) = self.priority {
            feedback.priority = priority;
        }
        if let Some(category_id) = self.category_id {
            feedback.category_id = Some(category_id);
        }
        feedback.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn submit(rating: Option<i32>) -> SubmitFeedback {
        SubmitFeedback {
            content: "broken button".into(),
            rating,
            ..Default::default()
        }
    }

    #[test]
    fn submission_starts_new_and_medium() {
        let now = Utc::now();
        let fb = submit(Some(3)).into_feedback(ApplicationId::new(), None, now).unwrap();
        assert_eq!(fb.status, FeedbackStatus::New);
        assert_eq!(fb.priority, Priority::Medium);
        assert_eq!(fb.rating, Some(3));
        assert!(fb.reviewed_at.is_none());
    }

    #[test]
    fn content_is_required() {
        let empty = SubmitFeedback {
            content: "   ".into(),
            ..Default::default()
        };
        assert_eq!(empty.validate(), Err(DomainError::validation("Content is required")));
    }

    #[test]
    fn patch_stamps_review_and_resolution() {
        let now = Utc::now();
        let mut fb = submit(None).into_feedback(ApplicationId::new(), None, now).unwrap();

        FeedbackPatch::parse(Some("in_progress"), None, None)
            .unwrap()
            .apply_to(&mut fb, now);
        assert_eq!(fb.status, FeedbackStatus::InProgress);
        assert_eq!(fb.reviewed_at, Some(now));
        assert!(fb.resolved_at.is_none());

        FeedbackPatch::parse(Some("closed"), Some("high"), None)
            .unwrap()
            .apply_to(&mut fb, now);
        assert_eq!(fb.resolved_at, Some(now));
        assert_eq!(fb.priority, Priority::High);
    }

    #[test]
    fn patch_rejects_empty_and_unknown_values() {
        assert_eq!(
            FeedbackPatch::parse(None, None, None),
            Err(DomainError::validation("No fields to update"))
        );
        assert_eq!(
            FeedbackPatch::parse(Some("done"), None, None),
            Err(DomainError::validation("Invalid status"))
        );
        assert_eq!(
            FeedbackPatch::parse(None, Some("urgent"), None),
            Err(DomainError::validation("Invalid priority"))
        );
    }

    #[test]
    fn null_json_blobs_are_dropped() {
        let s: SubmitFeedback =
            serde_json::from_str(r#"{"content":"x","browser_info":null,"metadata":{"k":1}}"#).unwrap();
        let fb = s.into_feedback(ApplicationId::new(), None, Utc::now()).unwrap();
        assert!(fb.browser_info.is_none());
        assert!(fb.metadata.is_some());
    }

    proptest! {
        #[test]
        fn rating_bounds(rating in -100i32..100) {
            let result = submit(Some(rating)).validate();
            if (1..=5).contains(&rating) {
                prop_assert!(result.is_ok());
            } else {
                prop_assert_eq!(result, Err(DomainError::validation("Rating must be between 1 and 5")));
            }
        }
    }
}
