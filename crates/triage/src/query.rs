use feedback_core::{ApplicationId, CategoryId};

use crate::{Feedback, FeedbackStatus, Priority};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Optional equality filters for listing feedback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedbackFilter {
    pub application_id: Option<ApplicationId>,
    pub status: Option<FeedbackStatus>,
    pub priority: Option<Priority>,
    pub category_id: Option<CategoryId>,
}

impl FeedbackFilter {
    pub fn matches(&self, feedback: &Feedback) -> bool {
        self.application_id.is_none_or(|id| feedback.application_id == id)
            && self.status.is_none_or(|s| feedback.status == s)
            && self.priority.is_none_or(|p| feedback.priority == p)
            && self.category_id.is_none_or(|c| feedback.category_id == Some(c))
    }
}

/// 1-based pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub limit: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Page {
    /// Lenient parse: unparsable or out-of-range values fall back to defaults.
    pub fn from_query(page: Option<&str>, limit: Option<&str>) -> Self {
        let page = page
            .and_then(|p| p.trim().parse::<i64>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1);
        let limit = limit
            .and_then(|l| l.trim().parse::<i64>().ok())
            .filter(|l| (1..=MAX_PAGE_SIZE).contains(l))
            .unwrap_or(DEFAULT_PAGE_SIZE);
        Self { page, limit }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}
