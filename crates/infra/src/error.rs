use thiserror::Error;

/// Storage failure, independent of the backing implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    /// A uniqueness constraint was violated (slug, api key, category name).
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Map SQLx errors onto `StoreError`.
///
/// | SQLx error | code | StoreError |
/// |---|---|---|
/// | Database (unique violation) | `23505` | `Conflict` |
/// | Database (foreign key violation) | `23503` | `NotFound` |
/// | RowNotFound | - | `NotFound` |
/// | anything else | - | `Storage` |
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(db_err.constraint().unwrap_or(operation).to_string()),
                Some("23503") => StoreError::NotFound,
                _ => StoreError::Storage(msg),
            }
        }
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::PoolClosed => StoreError::Storage(format!("connection pool closed in {}", operation)),
        other => StoreError::Storage(format!("sqlx error in {}: {}", operation, other)),
    }
}
