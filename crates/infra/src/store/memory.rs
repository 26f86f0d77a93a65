use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use feedback_applications::{ApiKey, Application, ApplicationPatch, Category, NewCategory};
use feedback_auth::{IdentityClaims, LocalUser};
use feedback_core::{ApplicationId, CategoryId, CommentId, FeedbackId, UserId};
use feedback_triage::{Comment, Feedback, FeedbackFilter, FeedbackPatch, Page};

use super::{ApplicationStore, FeedbackStore, UserStore};
use crate::{StoreError, StoreResult};

#[derive(Debug, Default)]
struct State {
    users: HashMap<UserId, LocalUser>,
    applications: HashMap<ApplicationId, Application>,
    categories: HashMap<CategoryId, Category>,
    next_category_id: i32,
    feedback: HashMap<FeedbackId, Feedback>,
    comments: HashMap<CommentId, Comment>,
}

impl State {
    fn remove_feedback(&mut self, id: FeedbackId) -> bool {
        self.comments.retain(|_, c| c.feedback_id != id);
        self.feedback.remove(&id).is_some()
    }
}

/// In-memory store for tests/dev.
///
/// One lock guards every table so cascades and uniqueness checks are atomic,
/// mirroring the foreign keys and unique indexes of the database schema.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Storage("in-memory store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Storage("in-memory store lock poisoned".to_string()))
    }
}

#[async_trait::async_trait]
impl UserStore for InMemoryStore {
    async fn upsert_from_claims(&self, claims: &IdentityClaims, now: DateTime<Utc>) -> StoreResult<LocalUser> {
        let mut state = self.write()?;
        let user = state
            .users
            .entry(claims.subject)
            .and_modify(|u| u.refresh_profile(claims, now))
            .or_insert_with(|| LocalUser::first_seen(claims, now));
        Ok(user.clone())
    }

    async fn get_user(&self, id: UserId) -> StoreResult<Option<LocalUser>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn set_flags(&self, id: UserId, is_admin: bool, is_active: bool) -> StoreResult<()> {
        let mut state = self.write()?;
        let user = state.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.is_admin = is_admin;
        user.is_active = is_active;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ApplicationStore for InMemoryStore {
    async fn insert_application(&self, app: Application) -> StoreResult<Application> {
        let mut state = self.write()?;
        if state.applications.values().any(|a| a.slug == app.slug) {
            return Err(StoreError::Conflict("applications_slug_key".to_string()));
        }
        if state.applications.values().any(|a| a.api_key == app.api_key) {
            return Err(StoreError::Conflict("applications_api_key_key".to_string()));
        }
        state.applications.insert(app.id, app.clone());
        Ok(app)
    }

    async fn list_applications(&self) -> StoreResult<Vec<Application>> {
        let mut apps: Vec<Application> = self.read()?.applications.values().cloned().collect();
        apps.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(apps)
    }

    async fn get_application(&self, id: ApplicationId) -> StoreResult<Option<Application>> {
        Ok(self.read()?.applications.get(&id).cloned())
    }

    async fn find_by_api_key(&self, api_key: &str) -> StoreResult<Option<Application>> {
        Ok(self
            .read()?
            .applications
            .values()
            .find(|a| a.api_key.as_str() == api_key)
            .cloned())
    }

    async fn update_application(
        &self,
        id: ApplicationId,
        patch: &ApplicationPatch,
        now: DateTime<Utc>,
    ) -> StoreResult<Application> {
        let mut state = self.write()?;
        let app = state.applications.get_mut(&id).ok_or(StoreError::NotFound)?;
        patch.apply_to(app, now);
        Ok(app.clone())
    }

    async fn replace_api_key(&self, id: ApplicationId, api_key: &ApiKey, now: DateTime<Utc>) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.applications.values().any(|a| a.id != id && &a.api_key == api_key) {
            return Err(StoreError::Conflict("applications_api_key_key".to_string()));
        }
        let app = state.applications.get_mut(&id).ok_or(StoreError::NotFound)?;
        app.api_key = api_key.clone();
        app.updated_at = now;
        Ok(())
    }

    async fn delete_application(&self, id: ApplicationId) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.applications.remove(&id).is_none() {
            return Err(StoreError::NotFound);
        }
        state.categories.retain(|_, c| c.application_id != id);
        let owned: Vec<FeedbackId> = state
            .feedback
            .values()
            .filter(|f| f.application_id == id)
            .map(|f| f.id)
            .collect();
        for feedback_id in owned {
            state.remove_feedback(feedback_id);
        }
        Ok(())
    }

    async fn list_categories(&self, app: ApplicationId) -> StoreResult<Vec<Category>> {
        let mut categories: Vec<Category> = self
            .read()?
            .categories
            .values()
            .filter(|c| c.application_id == app)
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn get_category(&self, app: ApplicationId, id: CategoryId) -> StoreResult<Option<Category>> {
        Ok(self
            .read()?
            .categories
            .get(&id)
            .filter(|c| c.application_id == app)
            .cloned())
    }

    async fn insert_category(&self, app: ApplicationId, category: NewCategory, now: DateTime<Utc>) -> StoreResult<Category> {
        let mut state = self.write()?;
        if !state.applications.contains_key(&app) {
            return Err(StoreError::NotFound);
        }
        if state
            .categories
            .values()
            .any(|c| c.application_id == app && c.name == category.name)
        {
            return Err(StoreError::Conflict("categories_application_id_name_key".to_string()));
        }

        state.next_category_id += 1;
        let record = Category {
            id: CategoryId::new(state.next_category_id),
            application_id: app,
            name: category.name,
            color: category.color,
            icon: category.icon,
            created_at: now,
        };
        state.categories.insert(record.id, record.clone());
        Ok(record)
    }
}

#[async_trait::async_trait]
impl FeedbackStore for InMemoryStore {
    async fn insert_feedback(&self, feedback: Feedback) -> StoreResult<Feedback> {
        let mut state = self.write()?;
        if !state.applications.contains_key(&feedback.application_id) {
            return Err(StoreError::NotFound);
        }
        state.feedback.insert(feedback.id, feedback.clone());
        Ok(feedback)
    }

    async fn get_feedback(&self, id: FeedbackId) -> StoreResult<Option<Feedback>> {
        Ok(self.read()?.feedback.get(&id).cloned())
    }

    async fn list_feedback(&self, filter: FeedbackFilter, page: Page) -> StoreResult<(Vec<Feedback>, i64)> {
        let state = self.read()?;
        let mut matching: Vec<&Feedback> = state.feedback.values().filter(|f| filter.matches(f)).collect();
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.as_uuid().cmp(a.id.as_uuid()))
        });

        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(page.limit).unwrap_or(0))
            .cloned()
            .collect();
        Ok((items, total))
    }

    async fn update_feedback(&self, id: FeedbackId, patch: &FeedbackPatch, now: DateTime<Utc>) -> StoreResult<Feedback> {
        let mut state = self.write()?;
        let feedback = state.feedback.get_mut(&id).ok_or(StoreError::NotFound)?;
        patch.apply_to(feedback, now);
        Ok(feedback.clone())
    }

    async fn delete_feedback(&self, id: FeedbackId) -> StoreResult<()> {
        if self.write()?.remove_feedback(id) {
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }

    async fn list_comments(&self, feedback_id: FeedbackId, include_internal: bool) -> StoreResult<Vec<Comment>> {
        let mut comments: Vec<Comment> = self
            .read()?
            .comments
            .values()
            .filter(|c| c.feedback_id == feedback_id && c.visible_to(include_internal))
            .cloned()
            .collect();
        comments.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.as_uuid().cmp(b.id.as_uuid()))
        });
        Ok(comments)
    }

    async fn get_comment(&self, feedback_id: FeedbackId, id: CommentId) -> StoreResult<Option<Comment>> {
        Ok(self
            .read()?
            .comments
            .get(&id)
            .filter(|c| c.feedback_id == feedback_id)
            .cloned())
    }

    async fn insert_comment(&self, comment: Comment) -> StoreResult<Comment> {
        let mut state = self.write()?;
        if !state.feedback.contains_key(&comment.feedback_id) {
            return Err(StoreError::NotFound);
        }
        state.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn update_comment(
        &self,
        feedback_id: FeedbackId,
        id: CommentId,
        content: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Comment> {
        let mut state = self.write()?;
        let comment = state
            .comments
            .get_mut(&id)
            .filter(|c| c.feedback_id == feedback_id)
            .ok_or(StoreError::NotFound)?;
        comment.content = content.to_string();
        comment.updated_at = now;
        Ok(comment.clone())
    }

    async fn delete_comment(&self, feedback_id: FeedbackId, id: CommentId) -> StoreResult<()> {
        let mut state = self.write()?;
        match state.comments.get(&id) {
            Some(c) if c.feedback_id == feedback_id => {
                state.comments.remove(&id);
                Ok(())
            }
            _ => Err(StoreError::NotFound),
        }
    }
}
