use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use feedback_core::{CommentId, DomainError, DomainResult, FeedbackId, UserId};

/// A comment in a feedback thread. Internal comments are visible to admins only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub feedback_id: FeedbackId,
    pub user_id: UserId,
    pub content: String,
    pub is_internal: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn visible_to(&self, is_admin: bool) -> bool {
        is_admin || !self.is_internal
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NewComment {
    pub content: String,
    pub is_internal: bool,
}

impl NewComment {
    pub fn validate(&self) -> DomainResult<()> {
        validate_content(&self.content)
    }

    pub fn into_comment(self, feedback_id: FeedbackId, author: UserId, now: DateTime<Utc>) -> DomainResult<Comment> {
        self.validate()?;
        Ok(Comment {
            id: CommentId::new(),
            feedback_id,
            user_id: author,
            content: self.content,
            is_internal: self.is_internal,
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CommentEdit {
    pub content: String,
}

impl CommentEdit {
    pub fn validate(&self) -> DomainResult<()> {
        validate_content(&self.content)
    }
}

fn validate_content(content: &str) -> DomainResult<()> {
    if content.trim().is_empty() {
        return Err(DomainError::validation("Content is required"));
    }
    Ok(())
}
