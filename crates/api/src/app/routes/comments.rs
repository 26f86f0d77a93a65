//! Discussion threads under a feedback item.
//!
//! Policy lets users reach these routes; the handlers add the per-comment
//! checks: only admins see or write internal notes, and only the author or an
//! admin may edit or delete a comment.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;

use feedback_core::{CommentId, FeedbackId};
use feedback_triage::{Comment, CommentEdit, NewComment};

use crate::app::dto::{self, JsonBody};
use crate::app::errors::ApiError;
use crate::app::routes::feedback::feedback_id;
use crate::app::services::AppServices;
use crate::context::SessionPrincipal;

fn comment_path(ids: (String, String)) -> Result<(FeedbackId, CommentId), ApiError> {
    Ok((feedback_id(&ids.0)?, dto::parse_id(&ids.1, "Invalid comment ID")?))
}

async fn ensure_feedback(services: &AppServices, id: FeedbackId) -> Result<(), ApiError> {
    services
        .feedback
        .get_feedback(id)
        .await?
        .map(|_| ())
        .ok_or_else(|| ApiError::not_found("Feedback not found"))
}

async fn owned_comment(
    services: &AppServices,
    principal: &SessionPrincipal,
    (feedback_id, comment_id): (FeedbackId, CommentId),
    denied: &str,
) -> Result<Comment, ApiError> {
    let comment = services
        .feedback
        .get_comment(feedback_id, comment_id)
        .await?
        .filter(|c| c.visible_to(principal.is_admin()))
        .ok_or_else(|| ApiError::not_found("Comment not found"))?;

    if !principal.can_modify(comment.user_id) {
        tracing::debug!(user_id = %principal.user_id, comment_id = %comment.id, "comment owned by someone else");
        return Err(ApiError::forbidden(denied));
    }
    Ok(comment)
}

pub async fn list_comments(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<SessionPrincipal>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = feedback_id(&id)?;
    ensure_feedback(&services, id).await?;

    let comments = services.feedback.list_comments(id, principal.is_admin()).await?;
    Ok(Json(comments).into_response())
}

pub async fn create_comment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<SessionPrincipal>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<NewComment>,
) -> Result<Response, ApiError> {
    let id = feedback_id(&id)?;
    body.validate()?;
    if body.is_internal && !principal.is_admin() {
        return Err(ApiError::forbidden("Only admins can create internal comments"));
    }
    ensure_feedback(&services, id).await?;

    let comment = body.into_comment(id, principal.user_id, Utc::now())?;
    let comment = services
        .feedback
        .insert_comment(comment)
        .await
        .map_err(|e| ApiError::from_store(e, "Feedback not found"))?;

    Ok((StatusCode::CREATED, Json(comment)).into_response())
}

pub async fn update_comment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<SessionPrincipal>,
    Path(ids): Path<(String, String)>,
    JsonBody(body): JsonBody<CommentEdit>,
) -> Result<Response, ApiError> {
    let ids = comment_path(ids)?;
    body.validate()?;
    owned_comment(&services, &principal, ids, "You can only update your own comments").await?;

    services
        .feedback
        .update_comment(ids.0, ids.1, &body.content, Utc::now())
        .await
        .map_err(|e| ApiError::from_store(e, "Comment not found"))?;

    Ok(dto::message("Comment updated successfully").into_response())
}

pub async fn delete_comment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<SessionPrincipal>,
    Path(ids): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let ids = comment_path(ids)?;
    owned_comment(&services, &principal, ids, "You can only delete your own comments").await?;

    services
        .feedback
        .delete_comment(ids.0, ids.1)
        .await
        .map_err(|e| ApiError::from_store(e, "Comment not found"))?;

    Ok(dto::message("Comment deleted successfully").into_response())
}
