//! Postgres-backed stores.
//!
//! Every statement uses bind parameters. Unique violations surface as
//! `StoreError::Conflict`, foreign key violations as `StoreError::NotFound`
//! (see `map_sqlx_error`). List queries skip rows that fail to decode and log
//! them at `warn` instead of failing the whole request.
//!
//! Expected tables: `users`, `applications`, `categories`, `feedback`,
//! `feedback_comments`. Schema migrations are managed outside this service.

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{instrument, warn};

use feedback_applications::{ApiKey, Application, ApplicationPatch, Category, NewCategory};
use feedback_auth::{IdentityClaims, LocalUser};
use feedback_core::{ApplicationId, CategoryId, CommentId, DomainError, FeedbackId, UserId};
use feedback_triage::{Comment, Feedback, FeedbackFilter, FeedbackPatch, Page, StatusStamp};

use super::{ApplicationStore, FeedbackStore, UserStore};
use crate::error::map_sqlx_error;
use crate::update::{SqlValue, UpdateSet};
use crate::{StoreError, StoreResult};

macro_rules! user_columns {
    () => {
        "id, email, name, is_admin, is_active, created_at, updated_at"
    };
}

macro_rules! application_columns {
    () => {
        "id, name, slug, description, api_key, is_active, webhook_url, allowed_origins, created_at, updated_at"
    };
}

macro_rules! category_columns {
    () => {
        "id, application_id, name, color, icon, created_at"
    };
}

macro_rules! feedback_columns {
    () => {
        "id, application_id, user_id, category_id, title, content, rating, status, priority, page_url, \
         browser_info, app_version, metadata, contact_email, created_at, updated_at, reviewed_at, resolved_at"
    };
}

macro_rules! comment_columns {
    () => {
        "id, feedback_id, user_id, content, is_internal, created_at, updated_at"
    };
}

/// Postgres implementation of every store trait.
///
/// `PgPool` is internally reference counted; cloning the store is cheap.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }
}

fn decode_error(e: DomainError) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(e))
}

fn user_from_row(row: &PgRow) -> Result<LocalUser, sqlx::Error> {
    Ok(LocalUser {
        id: UserId::from_uuid(row.try_get("id")?),
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        is_admin: row.try_get("is_admin")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn application_from_row(row: &PgRow) -> Result<Application, sqlx::Error> {
    Ok(Application {
        id: ApplicationId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        description: row.try_get::<Option<String>, _>("description")?.unwrap_or_default(),
        api_key: ApiKey::from_string(row.try_get::<String, _>("api_key")?),
        is_active: row.try_get("is_active")?,
        webhook_url: row.try_get("webhook_url")?,
        allowed_origins: row
            .try_get::<Option<Vec<String>>, _>("allowed_origins")?
            .unwrap_or_default(),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn category_from_row(row: &PgRow) -> Result<Category, sqlx::Error> {
    Ok(Category {
        id: CategoryId::new(row.try_get("id")?),
        application_id: ApplicationId::from_uuid(row.try_get("application_id")?),
        name: row.try_get("name")?,
        color: row.try_get::<Option<String>, _>("color")?.unwrap_or_default(),
        icon: row.try_get::<Option<String>, _>("icon")?.unwrap_or_default(),
        created_at: row.try_get("created_at")?,
    })
}

fn feedback_from_row(row: &PgRow) -> Result<Feedback, sqlx::Error> {
    let text = |column: &str| -> Result<String, sqlx::Error> {
        Ok(row.try_get::<Option<String>, _>(column)?.unwrap_or_default())
    };

    Ok(Feedback {
        id: FeedbackId::from_uuid(row.try_get("id")?),
        application_id: ApplicationId::from_uuid(row.try_get("application_id")?),
        user_id: row.try_get::<Option<uuid::Uuid>, _>("user_id")?.map(UserId::from_uuid),
        category_id: row.try_get::<Option<i32>, _>("category_id")?.map(CategoryId::new),
        title: text("title")?,
        content: row.try_get("content")?,
        rating: row.try_get("rating")?,
        status: row.try_get::<String, _>("status")?.parse().map_err(decode_error)?,
        priority: row.try_get::<String, _>("priority")?.parse().map_err(decode_error)?,
        page_url: text("page_url")?,
        browser_info: row
            .try_get::<Option<serde_json::Value>, _>("browser_info")?
            .filter(|v| !v.is_null()),
        app_version: text("app_version")?,
        metadata: row
            .try_get::<Option<serde_json::Value>, _>("metadata")?
            .filter(|v| !v.is_null()),
        contact_email: text("contact_email")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        reviewed_at: row.try_get("reviewed_at")?,
        resolved_at: row.try_get("resolved_at")?,
    })
}

fn comment_from_row(row: &PgRow) -> Result<Comment, sqlx::Error> {
    Ok(Comment {
        id: CommentId::from_uuid(row.try_get("id")?),
        feedback_id: FeedbackId::from_uuid(row.try_get("feedback_id")?),
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        content: row.try_get("content")?,
        is_internal: row.try_get("is_internal")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Decode every row that can be decoded; log and skip the rest.
fn decode_rows<T>(rows: &[PgRow], table: &str, decode: fn(&PgRow) -> Result<T, sqlx::Error>) -> Vec<T> {
    rows.iter()
        .filter_map(|row| match decode(row) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(table, error = %e, "skipping undecodable row");
                None
            }
        })
        .collect()
}

fn decode_one<T>(operation: &str, row: &PgRow, decode: fn(&PgRow) -> Result<T, sqlx::Error>) -> StoreResult<T> {
    decode(row).map_err(|e| StoreError::Storage(format!("failed to decode row in {}: {}", operation, e)))
}

#[async_trait::async_trait]
impl UserStore for PostgresStore {
    #[instrument(skip(self, claims), fields(user_id = %claims.subject), err)]
    async fn upsert_from_claims(&self, claims: &IdentityClaims, now: DateTime<Utc>) -> StoreResult<LocalUser> {
        let row = sqlx::query(concat!(
            "INSERT INTO users (id, email, name, is_admin, is_active, created_at, updated_at) ",
            "VALUES ($1, $2, $3, FALSE, TRUE, $4, $4) ",
            "ON CONFLICT (id) DO UPDATE SET email = EXCLUDED.email, name = EXCLUDED.name, updated_at = EXCLUDED.updated_at ",
            "RETURNING ",
            user_columns!()
        ))
        .bind(claims.subject.as_uuid())
        .bind(&claims.email)
        .bind(&claims.name)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_user", e))?;

        decode_one("upsert_user", &row, user_from_row)
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn get_user(&self, id: UserId) -> StoreResult<Option<LocalUser>> {
        let row = sqlx::query(concat!("SELECT ", user_columns!(), " FROM users WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_user", e))?;

        row.map(|r| decode_one("get_user", &r, user_from_row)).transpose()
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn set_flags(&self, id: UserId, is_admin: bool, is_active: bool) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET is_admin = $2, is_active = $3, updated_at = NOW() WHERE id = $1")
            .bind(id.as_uuid())
            .bind(is_admin)
            .bind(is_active)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_user_flags", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ApplicationStore for PostgresStore {
    #[instrument(skip(self, app), fields(application_id = %app.id, slug = %app.slug), err)]
    async fn insert_application(&self, app: Application) -> StoreResult<Application> {
        let row = sqlx::query(concat!(
            "INSERT INTO applications (id, name, slug, description, api_key, is_active, webhook_url, allowed_origins, created_at, updated_at) ",
            "VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING ",
            application_columns!()
        ))
        .bind(app.id.as_uuid())
        .bind(&app.name)
        .bind(&app.slug)
        .bind(&app.description)
        .bind(app.api_key.as_str())
        .bind(app.is_active)
        .bind(&app.webhook_url)
        .bind(&app.allowed_origins)
        .bind(app.created_at)
        .bind(app.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_application", e))?;

        decode_one("insert_application", &row, application_from_row)
    }

    #[instrument(skip(self), err)]
    async fn list_applications(&self) -> StoreResult<Vec<Application>> {
        let rows = sqlx::query(concat!("SELECT ", application_columns!(), " FROM applications ORDER BY name"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_applications", e))?;

        Ok(decode_rows(&rows, "applications", application_from_row))
    }

    #[instrument(skip(self), fields(application_id = %id), err)]
    async fn get_application(&self, id: ApplicationId) -> StoreResult<Option<Application>> {
        let row = sqlx::query(concat!("SELECT ", application_columns!(), " FROM applications WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_application", e))?;

        row.map(|r| decode_one("get_application", &r, application_from_row)).transpose()
    }

    #[instrument(skip(self, api_key), err)]
    async fn find_by_api_key(&self, api_key: &str) -> StoreResult<Option<Application>> {
        let row = sqlx::query(concat!("SELECT ", application_columns!(), " FROM applications WHERE api_key = $1"))
            .bind(api_key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_by_api_key", e))?;

        row.map(|r| decode_one("find_by_api_key", &r, application_from_row)).transpose()
    }

    #[instrument(skip(self, patch), fields(application_id = %id), err)]
    async fn update_application(
        &self,
        id: ApplicationId,
        patch: &ApplicationPatch,
        now: DateTime<Utc>,
    ) -> StoreResult<Application> {
        let mut set = UpdateSet::new();
        set.set_opt("name", patch.name.clone(), SqlValue::Text)
            .set_opt("description", patch.description.clone(), SqlValue::Text)
            .set_opt("is_active", patch.is_active, SqlValue::Bool)
            .set_opt("webhook_url", patch.webhook_url.clone(), |v| SqlValue::NullableText(Some(v)))
            .set_opt("allowed_origins", patch.allowed_origins.clone(), SqlValue::TextArray);
        if set.is_empty() {
            return self.get_application(id).await?.ok_or(StoreError::NotFound);
        }
        set.set("updated_at", SqlValue::Timestamp(now));

        let Some(mut qb) = set.build("applications", *id.as_uuid(), Some(application_columns!())) else {
            return Err(StoreError::NotFound);
        };
        let row = qb
            .build()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_application", e))?
            .ok_or(StoreError::NotFound)?;

        decode_one("update_application", &row, application_from_row)
    }

    #[instrument(skip(self, api_key), fields(application_id = %id), err)]
    async fn replace_api_key(&self, id: ApplicationId, api_key: &ApiKey, now: DateTime<Utc>) -> StoreResult<()> {
        let result = sqlx::query("UPDATE applications SET api_key = $1, updated_at = $2 WHERE id = $3")
            .bind(api_key.as_str())
            .bind(now)
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("replace_api_key", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self), fields(application_id = %id), err)]
    async fn delete_application(&self, id: ApplicationId) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("delete_application", e))?;

        sqlx::query(
            "DELETE FROM feedback_comments WHERE feedback_id IN (SELECT id FROM feedback WHERE application_id = $1)",
        )
        .bind(id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("delete_application_comments", e))?;

        sqlx::query("DELETE FROM feedback WHERE application_id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_application_feedback", e))?;

        sqlx::query("DELETE FROM categories WHERE application_id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_application_categories", e))?;

        let result = sqlx::query("DELETE FROM applications WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_application", e))?;

        if result.rows_affected() == 0 {
            // Dropping the transaction rolls it back.
            return Err(StoreError::NotFound);
        }

        tx.commit().await.map_err(|e| map_sqlx_error("delete_application", e))
    }

    #[instrument(skip(self), fields(application_id = %app), err)]
    async fn list_categories(&self, app: ApplicationId) -> StoreResult<Vec<Category>> {
        let rows = sqlx::query(concat!(
            "SELECT ",
            category_columns!(),
            " FROM categories WHERE application_id = $1 ORDER BY name"
        ))
        .bind(app.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_categories", e))?;

        Ok(decode_rows(&rows, "categories", category_from_row))
    }

    #[instrument(skip(self), fields(application_id = %app, category_id = %id), err)]
    async fn get_category(&self, app: ApplicationId, id: CategoryId) -> StoreResult<Option<Category>> {
        let row = sqlx::query(concat!(
            "SELECT ",
            category_columns!(),
            " FROM categories WHERE id = $1 AND application_id = $2"
        ))
        .bind(id.get())
        .bind(app.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_category", e))?;

        row.map(|r| decode_one("get_category", &r, category_from_row)).transpose()
    }

    #[instrument(skip(self, category), fields(application_id = %app), err)]
    async fn insert_category(&self, app: ApplicationId, category: NewCategory, now: DateTime<Utc>) -> StoreResult<Category> {
        let row = sqlx::query(concat!(
            "INSERT INTO categories (application_id, name, color, icon, created_at) ",
            "VALUES ($1, $2, $3, $4, $5) RETURNING ",
            category_columns!()
        ))
        .bind(app.as_uuid())
        .bind(&category.name)
        .bind(&category.color)
        .bind(&category.icon)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_category", e))?;

        decode_one("insert_category", &row, category_from_row)
    }
}

#[async_trait::async_trait]
impl FeedbackStore for PostgresStore {
    #[instrument(skip(self, feedback), fields(feedback_id = %feedback.id, application_id = %feedback.application_id), err)]
    async fn insert_feedback(&self, feedback: Feedback) -> StoreResult<Feedback> {
        let row = sqlx::query(concat!(
            "INSERT INTO feedback (id, application_id, user_id, category_id, title, content, rating, status, priority, ",
            "page_url, browser_info, app_version, metadata, contact_email, created_at, updated_at) ",
            "VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) RETURNING ",
            feedback_columns!()
        ))
        .bind(feedback.id.as_uuid())
        .bind(feedback.application_id.as_uuid())
        .bind(feedback.user_id.map(uuid::Uuid::from))
        .bind(feedback.category_id.map(|c| c.get()))
        .bind(&feedback.title)
        .bind(&feedback.content)
        .bind(feedback.rating)
        .bind(feedback.status.as_str())
        .bind(feedback.priority.as_str())
        .bind(&feedback.page_url)
        .bind(&feedback.browser_info)
        .bind(&feedback.app_version)
        .bind(&feedback.metadata)
        .bind(&feedback.contact_email)
        .bind(feedback.created_at)
        .bind(feedback.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_feedback", e))?;

        decode_one("insert_feedback", &row, feedback_from_row)
    }

    #[instrument(skip(self), fields(feedback_id = %id), err)]
    async fn get_feedback(&self, id: FeedbackId) -> StoreResult<Option<Feedback>> {
        let row = sqlx::query(concat!("SELECT ", feedback_columns!(), " FROM feedback WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_feedback", e))?;

        row.map(|r| decode_one("get_feedback", &r, feedback_from_row)).transpose()
    }

    #[instrument(skip(self), fields(page = page.page, limit = page.limit), err)]
    async fn list_feedback(&self, filter: FeedbackFilter, page: Page) -> StoreResult<(Vec<Feedback>, i64)> {
        let app_param = filter.application_id.map(uuid::Uuid::from);
        let status_param = filter.status.map(|s| s.as_str());
        let priority_param = filter.priority.map(|p| p.as_str());
        let category_param = filter.category_id.map(|c| c.get());

        let count_row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total
            FROM feedback
            WHERE ($1::uuid IS NULL OR application_id = $1)
                AND ($2::text IS NULL OR status = $2)
                AND ($3::text IS NULL OR priority = $3)
                AND ($4::int4 IS NULL OR category_id = $4)
            "#,
        )
        .bind(app_param)
        .bind(status_param)
        .bind(priority_param)
        .bind(category_param)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_feedback", e))?;

        let total: i64 = count_row
            .try_get("total")
            .map_err(|e| StoreError::Storage(format!("failed to read count: {}", e)))?;

        let rows = sqlx::query(concat!(
            "SELECT ",
            feedback_columns!(),
            r#"
            FROM feedback
            WHERE ($1::uuid IS NULL OR application_id = $1)
                AND ($2::text IS NULL OR status = $2)
                AND ($3::text IS NULL OR priority = $3)
                AND ($4::int4 IS NULL OR category_id = $4)
            ORDER BY created_at DESC, id DESC
            LIMIT $5 OFFSET $6
            "#
        ))
        .bind(app_param)
        .bind(status_param)
        .bind(priority_param)
        .bind(category_param)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_feedback", e))?;

        Ok((decode_rows(&rows, "feedback", feedback_from_row), total))
    }

    #[instrument(skip(self, patch), fields(feedback_id = %id), err)]
    async fn update_feedback(&self, id: FeedbackId, patch: &FeedbackPatch, now: DateTime<Utc>) -> StoreResult<Feedback> {
        let mut set = UpdateSet::new();
        set.set_opt("status", patch.status.map(|s| s.as_str().to_string()), SqlValue::Text);
        match patch.stamp() {
            Some(StatusStamp::Reviewed) => {
                set.set("reviewed_at", SqlValue::Timestamp(now));
            }
            Some(StatusStamp::Resolved) => {
                set.set("resolved_at", SqlValue::Timestamp(now));
            }
            None => {}
        }
        set.set_opt("priority", patch.priority.map(|p| p.as_str().to_string()), SqlValue::Text)
            .set_opt("category_id", patch.category_id.map(|c| c.get()), SqlValue::Int)
            .set("updated_at", SqlValue::Timestamp(now));

        let Some(mut qb) = set.build("feedback", *id.as_uuid(), Some(feedback_columns!())) else {
            return Err(StoreError::NotFound);
        };
        let row = qb
            .build()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_feedback", e))?
            .ok_or(StoreError::NotFound)?;

        decode_one("update_feedback", &row, feedback_from_row)
    }

    #[instrument(skip(self), fields(feedback_id = %id), err)]
    async fn delete_feedback(&self, id: FeedbackId) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("delete_feedback", e))?;

        sqlx::query("DELETE FROM feedback_comments WHERE feedback_id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_feedback_comments", e))?;

        let result = sqlx::query("DELETE FROM feedback WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_feedback", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        tx.commit().await.map_err(|e| map_sqlx_error("delete_feedback", e))
    }

    #[instrument(skip(self), fields(feedback_id = %feedback_id), err)]
    async fn list_comments(&self, feedback_id: FeedbackId, include_internal: bool) -> StoreResult<Vec<Comment>> {
        let rows = sqlx::query(concat!(
            "SELECT ",
            comment_columns!(),
            " FROM feedback_comments WHERE feedback_id = $1 AND ($2 OR is_internal = FALSE) ORDER BY created_at ASC, id ASC"
        ))
        .bind(feedback_id.as_uuid())
        .bind(include_internal)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_comments", e))?;

        Ok(decode_rows(&rows, "feedback_comments", comment_from_row))
    }

    #[instrument(skip(self), fields(feedback_id = %feedback_id, comment_id = %id), err)]
    async fn get_comment(&self, feedback_id: FeedbackId, id: CommentId) -> StoreResult<Option<Comment>> {
        let row = sqlx::query(concat!(
            "SELECT ",
            comment_columns!(),
            " FROM feedback_comments WHERE id = $1 AND feedback_id = $2"
        ))
        .bind(id.as_uuid())
        .bind(feedback_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_comment", e))?;

        row.map(|r| decode_one("get_comment", &r, comment_from_row)).transpose()
    }

    #[instrument(skip(self, comment), fields(feedback_id = %comment.feedback_id, comment_id = %comment.id), err)]
    async fn insert_comment(&self, comment: Comment) -> StoreResult<Comment> {
        let row = sqlx::query(concat!(
            "INSERT INTO feedback_comments (id, feedback_id, user_id, content, is_internal, created_at, updated_at) ",
            "VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING ",
            comment_columns!()
        ))
        .bind(comment.id.as_uuid())
        .bind(comment.feedback_id.as_uuid())
        .bind(comment.user_id.as_uuid())
        .bind(&comment.content)
        .bind(comment.is_internal)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_comment", e))?;

        decode_one("insert_comment", &row, comment_from_row)
    }

    #[instrument(skip(self, content), fields(feedback_id = %feedback_id, comment_id = %id), err)]
    async fn update_comment(
        &self,
        feedback_id: FeedbackId,
        id: CommentId,
        content: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Comment> {
        let row = sqlx::query(concat!(
            "UPDATE feedback_comments SET content = $1, updated_at = $2 WHERE id = $3 AND feedback_id = $4 RETURNING ",
            comment_columns!()
        ))
        .bind(content)
        .bind(now)
        .bind(id.as_uuid())
        .bind(feedback_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_comment", e))?
        .ok_or(StoreError::NotFound)?;

        decode_one("update_comment", &row, comment_from_row)
    }

    #[instrument(skip(self), fields(feedback_id = %feedback_id, comment_id = %id), err)]
    async fn delete_comment(&self, feedback_id: FeedbackId, id: CommentId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM feedback_comments WHERE id = $1 AND feedback_id = $2")
            .bind(id.as_uuid())
            .bind(feedback_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_comment", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
