//! Endpoints called by embedded widgets. The caller is an application, not a user.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

use feedback_triage::SubmitFeedback;

use crate::app::dto::{self, FeedbackStatusView, JsonBody, SubmittedFeedback};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::TenantContext;

pub fn router() -> Router {
    Router::new()
        .route("/feedback", post(submit_feedback))
        .route("/feedback/:id", get(feedback_status))
        .route("/categories", get(list_categories))
}

pub async fn submit_feedback(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    JsonBody(body): JsonBody<SubmitFeedback>,
) -> Result<Response, ApiError> {
    body.validate()?;

    if let Some(category_id) = body.category_id {
        services
            .applications
            .get_category(tenant.application_id(), category_id)
            .await?
            .ok_or_else(|| ApiError::bad_request("Invalid category"))?;
    }

    let feedback = body.into_feedback(tenant.application_id(), None, Utc::now())?;
    let feedback = services.feedback.insert_feedback(feedback).await?;

    tracing::info!(feedback_id = %feedback.id, application_id = %feedback.application_id, "feedback submitted");
    Ok(Json(SubmittedFeedback {
        id: feedback.id,
        message: "Feedback submitted successfully",
    })
    .into_response())
}

/// Feedback of another tenant is reported as absent.
pub async fn feedback_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = dto::parse_id(&id, "Invalid feedback ID")?;

    let feedback = services
        .feedback
        .get_feedback(id)
        .await?
        .filter(|fb| fb.application_id == tenant.application_id())
        .ok_or_else(|| ApiError::not_found("Feedback not found"))?;

    Ok(Json(FeedbackStatusView::from(feedback)).into_response())
}

pub async fn list_categories(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
) -> Result<Response, ApiError> {
    let categories = services.applications.list_categories(tenant.application_id()).await?;
    Ok(Json(categories).into_response())
}
