use axum::Router;

pub mod applications;
pub mod categories;
pub mod comments;
pub mod feedback;
pub mod public;
pub mod system;

/// Dashboard endpoints guarded by the role policy.
pub fn router() -> Router {
    Router::new()
        .nest("/feedback", feedback::router())
        .nest("/applications", applications::router())
}
