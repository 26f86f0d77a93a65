//! Storage abstractions.
//!
//! Each trait has an in-memory implementation (dev/tests) and a Postgres one.
//! Both enforce the same uniqueness and cascade rules.

pub mod memory;
pub mod postgres;

use chrono::{DateTime, Utc};

use feedback_applications::{ApiKey, Application, ApplicationPatch, Category, NewCategory};
use feedback_auth::{IdentityClaims, LocalUser};
use feedback_core::{ApplicationId, CategoryId, CommentId, FeedbackId, UserId};
use feedback_triage::{Comment, Feedback, FeedbackFilter, FeedbackPatch, Page};

use crate::StoreResult;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    /// Insert the user (active, non-admin) or refresh email/name in one step.
    async fn upsert_from_claims(&self, claims: &IdentityClaims, now: DateTime<Utc>) -> StoreResult<LocalUser>;

    async fn get_user(&self, id: UserId) -> StoreResult<Option<LocalUser>>;

    /// Set the locally managed flags. `NotFound` if the user was never seen.
    async fn set_flags(&self, id: UserId, is_admin: bool, is_active: bool) -> StoreResult<()>;
}

#[async_trait::async_trait]
pub trait ApplicationStore: Send + Sync {
    async fn insert_application(&self, app: Application) -> StoreResult<Application>;

    /// Ordered by name.
    async fn list_applications(&self) -> StoreResult<Vec<Application>>;

    async fn get_application(&self, id: ApplicationId) -> StoreResult<Option<Application>>;

    async fn find_by_api_key(&self, api_key: &str) -> StoreResult<Option<Application>>;

    async fn update_application(
        &self,
        id: ApplicationId,
        patch: &ApplicationPatch,
        now: DateTime<Utc>,
    ) -> StoreResult<Application>;

    /// Swap the key in a single write; the old key stops resolving immediately.
    async fn replace_api_key(&self, id: ApplicationId, api_key: &ApiKey, now: DateTime<Utc>) -> StoreResult<()>;

    /// Deletes the application with its categories, feedback and comments.
    async fn delete_application(&self, id: ApplicationId) -> StoreResult<()>;

    /// Ordered by name.
    async fn list_categories(&self, app: ApplicationId) -> StoreResult<Vec<Category>>;

    async fn get_category(&self, app: ApplicationId, id: CategoryId) -> StoreResult<Option<Category>>;

    /// `NotFound` for an unknown application, `Conflict` for a duplicate name.
    async fn insert_category(&self, app: ApplicationId, category: NewCategory, now: DateTime<Utc>) -> StoreResult<Category>;
}

#[async_trait::async_trait]
pub trait FeedbackStore: Send + Sync {
    async fn insert_feedback(&self, feedback: Feedback) -> StoreResult<Feedback>;

    async fn get_feedback(&self, id: FeedbackId) -> StoreResult<Option<Feedback>>;

    /// Newest first; returns the page and the total number of matches.
    async fn list_feedback(&self, filter: FeedbackFilter, page: Page) -> StoreResult<(Vec<Feedback>, i64)>;

    async fn update_feedback(&self, id: FeedbackId, patch: &FeedbackPatch, now: DateTime<Utc>) -> StoreResult<Feedback>;

    /// Deletes the feedback with its comments.
    async fn delete_feedback(&self, id: FeedbackId) -> StoreResult<()>;

    /// Oldest first. Internal comments only when `include_internal`.
    async fn list_comments(&self, feedback_id: FeedbackId, include_internal: bool) -> StoreResult<Vec<Comment>>;

    async fn get_comment(&self, feedback_id: FeedbackId, id: CommentId) -> StoreResult<Option<Comment>>;

    async fn insert_comment(&self, comment: Comment) -> StoreResult<Comment>;

    async fn update_comment(
        &self,
        feedback_id: FeedbackId,
        id: CommentId,
        content: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Comment>;

    async fn delete_comment(&self, feedback_id: FeedbackId, id: CommentId) -> StoreResult<()>;
}
