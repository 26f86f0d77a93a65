//! Wire shapes that differ from the domain types.

use axum::extract::{FromRequest, Json, Request};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use feedback_applications::Application;
use feedback_core::{ApplicationId, CategoryId, FeedbackId};
use feedback_triage::{Feedback, FeedbackStatus, Priority};

use super::errors::ApiError;

/// JSON body whose rejections are reported as `{"error": "Invalid request body"}`.
pub struct JsonBody<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                debug!(reason = %rejection.body_text(), "rejecting request body");
                Err(ApiError::bad_request("Invalid request body"))
            }
        }
    }
}

pub fn message(text: &str) -> Json<Value> {
    Json(json!({ "message": text }))
}

/// Parse a path segment, answering 400 with `invalid` when it is malformed.
pub fn parse_id<T: std::str::FromStr>(raw: &str, invalid: &str) -> Result<T, ApiError> {
    raw.parse().map_err(|_| ApiError::bad_request(invalid))
}

/// Application as listed: the API key is only shown on create, get and rotate.
#[derive(Debug, Serialize)]
pub struct ApplicationView {
    pub id: ApplicationId,
    pub name: String,
    pub slug: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    pub allowed_origins: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApplicationView {
    pub fn summary(app: Application) -> Self {
        let mut view = Self::detail(app);
        view.api_key = None;
        view
    }

    pub fn detail(app: Application) -> Self {
        Self {
            id: app.id,
            name: app.name,
            slug: app.slug,
            description: app.description,
            api_key: Some(app.api_key.into_inner()),
            is_active: app.is_active,
            webhook_url: app.webhook_url,
            allowed_origins: app.allowed_origins,
            created_at: app.created_at,
            updated_at: app.updated_at,
        }
    }
}

/// Query string of `GET /feedback`. Everything arrives as text; empty means absent.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FeedbackListQuery {
    pub app_id: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub category_id: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl FeedbackListQuery {
    pub fn app_id(&self) -> Result<Option<ApplicationId>, ApiError> {
        present(&self.app_id).map(|v| parse_id(v, "Invalid app_id")).transpose()
    }

    pub fn status(&self) -> Result<Option<FeedbackStatus>, ApiError> {
        Ok(present(&self.status).map(str::parse::<FeedbackStatus>).transpose()?)
    }

    pub fn priority(&self) -> Result<Option<Priority>, ApiError> {
        Ok(present(&self.priority).map(str::parse::<Priority>).transpose()?)
    }

    pub fn category_id(&self) -> Result<Option<CategoryId>, ApiError> {
        present(&self.category_id)
            .map(|v| parse_id(v, "Invalid category_id"))
            .transpose()
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Serialize)]
pub struct FeedbackPage {
    pub feedback: Vec<Feedback>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateFeedbackRequest {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub category_id: Option<CategoryId>,
}

#[derive(Debug, Serialize)]
pub struct SubmittedFeedback {
    pub id: FeedbackId,
    pub message: &'static str,
}

/// What a submitter may see about their own feedback.
#[derive(Debug, Serialize)]
pub struct FeedbackStatusView {
    pub id: FeedbackId,
    pub status: FeedbackStatus,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
}

impl From<Feedback> for FeedbackStatusView {
    fn from(fb: Feedback) -> Self {
        Self {
            id: fb.id,
            status: fb.status,
            priority: fb.priority,
            created_at: fb.created_at,
        }
    }
}
