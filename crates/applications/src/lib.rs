//! Applications domain module.
//!
//! An application is the tenant boundary of the feedback service: it owns an
//! API key, its categories and all feedback submitted with that key. This
//! crate holds the records and their validation rules (no IO, no HTTP, no
//! storage).

pub mod api_key;
pub mod application;
pub mod category;

pub use api_key::{ApiKey, ApiKeyError};
pub use application::{Application, ApplicationPatch, NewApplication};
pub use category::{Category, DEFAULT_CATEGORY_COLOR, NewCategory};
