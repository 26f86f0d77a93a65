//! Feedback triage domain module.
//!
//! Feedback submissions, their review workflow (status / priority) and the
//! comment thread attached to each submission. Deterministic domain logic
//! only (no IO, no HTTP, no storage).

pub mod comment;
pub mod feedback;
pub mod query;
pub mod status;

pub use comment::{Comment, CommentEdit, NewComment};
pub use feedback::{Feedback, FeedbackPatch, SubmitFeedback};
pub use query::{FeedbackFilter, Page};
pub use status::{FeedbackStatus, Priority, StatusStamp};
