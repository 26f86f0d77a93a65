//! `feedback-core`: shared building blocks for the feedback service.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{ApplicationId, CategoryId, CommentId, FeedbackId, UserId};
