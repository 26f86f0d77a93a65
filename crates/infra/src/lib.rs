//! Infrastructure layer: storage adapters and the request-time lookups
//! (identity synchronization, tenant resolution) built on top of them.

pub mod error;
pub mod identity;
pub mod store;
pub mod tenant;
pub mod update;

pub use error::{StoreError, StoreResult};
pub use identity::{SyncError, sync_user};
pub use store::{ApplicationStore, FeedbackStore, InMemoryStore, PostgresStore, UserStore};
pub use tenant::{TenantError, resolve_tenant};
pub use update::{SqlValue, UpdateSet};
