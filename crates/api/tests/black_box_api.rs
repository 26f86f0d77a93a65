use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use feedback_api::app::{build_app, AppServices};
use feedback_applications::{ApiKey, Application, ApplicationPatch, Category, NewCategory};
use feedback_auth::{IdentityClaims, JwtClaims, LocalUser, PolicyTable, Rs256JwtValidator};
use feedback_core::{ApplicationId, CategoryId, UserId};
use feedback_infra::{ApplicationStore, StoreError, StoreResult, UserStore};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{json, Value};

const SIGNING_KEY: &[u8] = include_bytes!("../../../testdata/signing_key.pem");
const PUBLIC_KEY: &[u8] = include_bytes!("../../../testdata/signing_key.pub.pem");
const OTHER_SIGNING_KEY: &[u8] = include_bytes!("../../../testdata/other_signing_key.pem");

struct TestServer {
    base_url: String,
    services: Arc<AppServices>,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(in_memory_services()).await
    }

    /// Same router as prod on an ephemeral port.
    async fn spawn_with(services: AppServices) -> Self {
        let services = Arc::new(services);
        let app = build_app(services.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}/api/v1", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            services,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// A user who has signed in once, optionally promoted to admin.
    async fn user(&self, admin: bool) -> (UserId, String) {
        let id = UserId::new();
        let identity = IdentityClaims {
            subject: id,
            email: format!("{id}@example.com"),
            name: "Test User".into(),
        };
        self.services.users.upsert_from_claims(&identity, Utc::now()).await.unwrap();
        if admin {
            self.services.users.set_flags(id, true, true).await.unwrap();
        }
        (id, mint_jwt(SIGNING_KEY, id, ChronoDuration::minutes(10)))
    }

    /// Create an application as `admin_token`; returns `(id, api_key)`.
    async fn application(&self, admin_token: &str, slug: &str) -> (String, String) {
        let res = self
            .client
            .post(self.url("/applications"))
            .bearer_auth(admin_token)
            .json(&json!({ "name": format!("App {slug}"), "slug": slug }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Value = res.json().await.unwrap();
        (
            body["id"].as_str().unwrap().to_string(),
            body["api_key"].as_str().unwrap().to_string(),
        )
    }

    async fn submit(&self, api_key: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url("/public/feedback"))
            .header("X-API-Key", api_key)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn submit_ok(&self, api_key: &str, content: &str) -> String {
        let res = self.submit(api_key, json!({ "content": content })).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        body["id"].as_str().unwrap().to_string()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn in_memory_services() -> AppServices {
    let verifier = Rs256JwtValidator::from_rsa_pem(PUBLIC_KEY).expect("public key");
    let policy = PolicyTable::embedded().expect("embedded policy");
    AppServices::in_memory(Arc::new(verifier), policy)
}

fn mint_jwt(signing_key: &[u8], sub: UserId, ttl: ChronoDuration) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub,
        email: format!("{sub}@example.com"),
        name: "Test User".into(),
        exp: now + ttl,
        nbf: None,
        iat: Some(now - ChronoDuration::minutes(30)),
        iss: None,
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::RS256),
        &claims,
        &EncodingKey::from_rsa_pem(signing_key).expect("signing key"),
    )
    .expect("failed to encode jwt")
}

async fn error_of(res: reqwest::Response) -> String {
    let body: Value = res.json().await.unwrap();
    body["error"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn system_endpoints_and_unknown_routes() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "OK");

    let res = srv.client.post(srv.url("/auth/refresh")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_IMPLEMENTED);
    assert_eq!(error_of(res).await, "Refresh token endpoint not implemented");

    let res = srv.client.post(srv.url("/auth/logout")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Logged out successfully");

    let res = srv.client.get(srv.url("/nope")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_of(res).await, "Not found");
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/auth/me")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv
        .client
        .get(srv.url("/feedback"))
        .header("Authorization", "Token abc")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv.client.get(srv.url("/auth/me")).bearer_auth("not.a.jwt").send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn tokens_from_other_keys_or_expired_are_rejected() {
    let srv = TestServer::spawn().await;
    let sub = UserId::new();

    let forged = mint_jwt(OTHER_SIGNING_KEY, sub, ChronoDuration::minutes(10));
    let res = srv.client.get(srv.url("/auth/me")).bearer_auth(forged).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let expired = mint_jwt(SIGNING_KEY, sub, ChronoDuration::minutes(-5));
    let res = srv.client.get(srv.url("/auth/me")).bearer_auth(expired).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Neither attempt may create a local user.
    assert!(srv.services.users.get_user(sub).await.unwrap().is_none());
}

#[tokio::test]
async fn first_request_creates_one_local_user() {
    let srv = TestServer::spawn().await;
    let sub = UserId::new();
    let token = mint_jwt(SIGNING_KEY, sub, ChronoDuration::minutes(10));

    for _ in 0..3 {
        let res = srv.client.get(srv.url("/auth/me")).bearer_auth(&token).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["user_id"], sub.to_string());
        assert_eq!(body["role"], "user");
    }

    let user = srv.services.users.get_user(sub).await.unwrap().expect("synced user");
    assert!(user.is_active);
    assert!(!user.is_admin);
}

#[tokio::test]
async fn admin_flag_yields_admin_role() {
    let srv = TestServer::spawn().await;
    let (_, token) = srv.user(true).await;

    let res = srv.client.get(srv.url("/auth/me")).bearer_auth(&token).send().await.unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["role"], "admin");
}

#[tokio::test]
async fn disabled_account_is_refused() {
    let srv = TestServer::spawn().await;
    let (id, token) = srv.user(false).await;
    srv.services.users.set_flags(id, false, false).await.unwrap();

    let res = srv.client.get(srv.url("/auth/me")).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_of(res).await, "User account is inactive");
}

#[tokio::test]
async fn users_cannot_manage_applications() {
    let srv = TestServer::spawn().await;
    let (_, user) = srv.user(false).await;
    let (_, admin) = srv.user(true).await;

    let res = srv.client.get(srv.url("/applications")).bearer_auth(&user).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_of(res).await, "Forbidden");

    let res = srv
        .client
        .post(srv.url("/applications"))
        .bearer_auth(&user)
        .json(&json!({ "name": "Sneaky", "slug": "sneaky" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv.client.get(srv.url("/applications")).bearer_auth(&admin).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn application_lifecycle() {
    let srv = TestServer::spawn().await;
    let (_, admin) = srv.user(true).await;
    let (id, api_key) = srv.application(&admin, "shop").await;
    assert_eq!(api_key.len(), 44);

    let res = srv
        .client
        .post(srv.url("/applications"))
        .bearer_auth(&admin)
        .json(&json!({ "name": "Again", "slug": "shop" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = srv
        .client
        .post(srv.url("/applications"))
        .bearer_auth(&admin)
        .json(&json!({ "name": "No slug" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_of(res).await, "Name and slug are required");

    let res = srv.client.get(srv.url("/applications")).bearer_auth(&admin).send().await.unwrap();
    let list: Value = res.json().await.unwrap();
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert!(list[0].get("api_key").is_none());

    let res = srv
        .client
        .get(srv.url(&format!("/applications/{id}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let detail: Value = res.json().await.unwrap();
    assert_eq!(detail["api_key"], api_key.as_str());

    let res = srv
        .client
        .patch(srv.url(&format!("/applications/{id}")))
        .bearer_auth(&admin)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_of(res).await, "No fields to update");

    let res = srv
        .client
        .patch(srv.url(&format!("/applications/{id}")))
        .bearer_auth(&admin)
        .json(&json!({ "description": "Storefront" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let missing = uuid::Uuid::now_v7();
    let res = srv
        .client
        .get(srv.url(&format!("/applications/{missing}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn public_submission_validates_content_and_rating() {
    let srv = TestServer::spawn().await;
    let (_, admin) = srv.user(true).await;
    let (_, api_key) = srv.application(&admin, "widget").await;

    let res = srv.submit(&api_key, json!({ "content": "broken button", "rating": 3 })).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert!(body["id"].as_str().is_some());

    let res = srv.submit(&api_key, json!({ "content": "broken button", "rating": 7 })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_of(res).await, "Rating must be between 1 and 5");

    let res = srv.submit(&api_key, json!({ "content": "   " })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_of(res).await, "Content is required");

    let res = srv.submit(&api_key, json!({ "content": "x", "category_id": 999 })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_of(res).await, "Invalid category");

    let res = srv
        .client
        .post(srv.url("/public/feedback"))
        .header("X-API-Key", &api_key)
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_of(res).await, "Invalid request body");
}

#[tokio::test]
async fn public_requests_need_a_valid_key() {
    let srv = TestServer::spawn().await;
    let (_, admin) = srv.user(true).await;
    let (_, api_key) = srv.application(&admin, "keys").await;

    let res = srv.client.get(srv.url("/public/categories")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_of(res).await, "Missing API key");

    let res = srv
        .client
        .get(srv.url("/public/categories"))
        .header("X-API-Key", "bogus")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_of(res).await, "Invalid API key");

    let res = srv
        .client
        .get(srv.url("/public/categories"))
        .query(&[("api_key", api_key.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn disabled_tenant_rejects_public_requests() {
    let srv = TestServer::spawn().await;
    let (_, admin) = srv.user(true).await;
    let (id, api_key) = srv.application(&admin, "paused").await;

    let res = srv
        .client
        .patch(srv.url(&format!("/applications/{id}")))
        .bearer_auth(&admin)
        .json(&json!({ "is_active": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv.submit(&api_key, json!({ "content": "hello" })).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_of(res).await, "Application is inactive");

    let res = srv
        .client
        .get(srv.url("/public/categories"))
        .header("X-API-Key", &api_key)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn regenerated_key_replaces_the_old_one() {
    let srv = TestServer::spawn().await;
    let (_, admin) = srv.user(true).await;
    let (id, old_key) = srv.application(&admin, "rotate").await;

    let res = srv
        .client
        .post(srv.url(&format!("/applications/{id}/regenerate-key")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    let new_key = body["api_key"].as_str().unwrap().to_string();
    assert_ne!(new_key, old_key);

    let res = srv.submit(&old_key, json!({ "content": "hello" })).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv.submit(&new_key, json!({ "content": "hello" })).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn public_status_is_scoped_to_the_tenant() {
    let srv = TestServer::spawn().await;
    let (_, admin) = srv.user(true).await;
    let (_, key_a) = srv.application(&admin, "tenant-a").await;
    let (_, key_b) = srv.application(&admin, "tenant-b").await;

    let id = srv.submit_ok(&key_a, "only for a").await;

    let res = srv
        .client
        .get(srv.url(&format!("/public/feedback/{id}")))
        .header("X-API-Key", &key_a)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "new");
    assert_eq!(body["priority"], "medium");
    assert!(body.get("content").is_none());

    let res = srv
        .client
        .get(srv.url(&format!("/public/feedback/{id}")))
        .header("X-API-Key", &key_b)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn categories_are_per_application() {
    let srv = TestServer::spawn().await;
    let (_, admin) = srv.user(true).await;
    let (id, api_key) = srv.application(&admin, "cats").await;

    for name in ["UI", "Billing"] {
        let res = srv
            .client
            .post(srv.url(&format!("/applications/{id}/categories")))
            .bearer_auth(&admin)
            .json(&json!({ "name": name }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    let res = srv
        .client
        .post(srv.url(&format!("/applications/{id}/categories")))
        .bearer_auth(&admin)
        .json(&json!({ "name": "UI" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = srv
        .client
        .post(srv.url(&format!("/applications/{}/categories", uuid::Uuid::now_v7())))
        .bearer_auth(&admin)
        .json(&json!({ "name": "Orphan" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = srv
        .client
        .get(srv.url("/public/categories"))
        .header("X-API-Key", &api_key)
        .send()
        .await
        .unwrap();
    let categories: Value = res.json().await.unwrap();
    let names: Vec<&str> = categories
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Billing", "UI"]);
    assert_eq!(categories[0]["color"], "#3b82f6");

    let category_id = categories[0]["id"].as_i64().unwrap();
    let res = srv
        .submit(&api_key, json!({ "content": "invoice wrong", "category_id": category_id }))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn triage_updates_stamp_timestamps() {
    let srv = TestServer::spawn().await;
    let (_, admin) = srv.user(true).await;
    let (_, user) = srv.user(false).await;
    let (_, api_key) = srv.application(&admin, "triage").await;
    let id = srv.submit_ok(&api_key, "slow page").await;

    let res = srv
        .client
        .patch(srv.url(&format!("/feedback/{id}")))
        .bearer_auth(&user)
        .json(&json!({ "status": "in_progress" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv
        .client
        .patch(srv.url(&format!("/feedback/{id}")))
        .bearer_auth(&admin)
        .json(&json!({ "status": "done" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_of(res).await, "Invalid status");

    let res = srv
        .client
        .patch(srv.url(&format!("/feedback/{id}")))
        .bearer_auth(&admin)
        .json(&json!({ "status": "in_progress", "priority": "high" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv
        .client
        .get(srv.url(&format!("/feedback/{id}")))
        .bearer_auth(&user)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let fb: Value = res.json().await.unwrap();
    assert_eq!(fb["status"], "in_progress");
    assert_eq!(fb["priority"], "high");
    assert!(fb["reviewed_at"].is_string());
    assert!(fb.get("resolved_at").is_none());
}

#[tokio::test]
async fn feedback_listing_filters_and_pages() {
    let srv = TestServer::spawn().await;
    let (_, admin) = srv.user(true).await;
    let (app_a, key_a) = srv.application(&admin, "list-a").await;
    let (_, key_b) = srv.application(&admin, "list-b").await;

    for i in 0..3 {
        srv.submit_ok(&key_a, &format!("a{i}")).await;
    }
    srv.submit_ok(&key_b, "b0").await;

    let res = srv
        .client
        .get(srv.url("/feedback"))
        .query(&[("app_id", app_a.as_str()), ("limit", "2")])
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["total"], 3);
    assert_eq!(body["limit"], 2);
    assert_eq!(body["page"], 1);
    assert_eq!(body["feedback"].as_array().unwrap().len(), 2);

    // Out-of-range paging falls back to the defaults.
    let res = srv
        .client
        .get(srv.url("/feedback"))
        .query(&[("page", "0"), ("limit", "1000")])
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["total"], 4);
    assert_eq!(body["page"], 1);
    assert_eq!(body["limit"], 20);

    let res = srv
        .client
        .get(srv.url("/feedback"))
        .query(&[("priority", "urgent-ish")])
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_of(res).await, "Invalid priority");
}

#[tokio::test]
async fn comment_ownership_is_enforced() {
    let srv = TestServer::spawn().await;
    let (_, admin) = srv.user(true).await;
    let (_, author) = srv.user(false).await;
    let (_, other) = srv.user(false).await;
    let (_, api_key) = srv.application(&admin, "comments").await;
    let fid = srv.submit_ok(&api_key, "needs dark mode").await;
    let comments_url = srv.url(&format!("/feedback/{fid}/comments"));

    let res = srv
        .client
        .post(&comments_url)
        .bearer_auth(&author)
        .json(&json!({ "content": "+1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let comment: Value = res.json().await.unwrap();
    let cid = comment["id"].as_str().unwrap().to_string();
    let comment_url = format!("{comments_url}/{cid}");

    let res = srv
        .client
        .post(&comments_url)
        .bearer_auth(&other)
        .json(&json!({ "content": "me too" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = srv
        .client
        .patch(&comment_url)
        .bearer_auth(&other)
        .json(&json!({ "content": "edited" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv.client.delete(&comment_url).bearer_auth(&other).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_of(res).await, "You can only delete your own comments");

    let res = srv
        .client
        .patch(&comment_url)
        .bearer_auth(&author)
        .json(&json!({ "content": "+1 (edited)" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv.client.delete(&comment_url).bearer_auth(&author).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv.client.get(&comments_url).bearer_auth(&author).send().await.unwrap();
    let remaining: Value = res.json().await.unwrap();
    assert_eq!(remaining.as_array().unwrap().len(), 1);
    assert_eq!(remaining[0]["content"], "me too");

    let res = srv.client.delete(&comment_url).bearer_auth(&admin).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn internal_comments_are_admin_only() {
    let srv = TestServer::spawn().await;
    let (_, admin) = srv.user(true).await;
    let (_, user) = srv.user(false).await;
    let (_, api_key) = srv.application(&admin, "internal").await;
    let fid = srv.submit_ok(&api_key, "crash on save").await;
    let comments_url = srv.url(&format!("/feedback/{fid}/comments"));

    let res = srv
        .client
        .post(&comments_url)
        .bearer_auth(&user)
        .json(&json!({ "content": "psst", "is_internal": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv
        .client
        .post(&comments_url)
        .bearer_auth(&admin)
        .json(&json!({ "content": "known issue", "is_internal": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = srv.client.get(&comments_url).bearer_auth(&user).send().await.unwrap();
    let seen: Value = res.json().await.unwrap();
    assert!(seen.as_array().unwrap().is_empty());

    let res = srv.client.get(&comments_url).bearer_auth(&admin).send().await.unwrap();
    let seen: Value = res.json().await.unwrap();
    assert_eq!(seen.as_array().unwrap().len(), 1);

    let missing = uuid::Uuid::now_v7();
    let res = srv
        .client
        .get(srv.url(&format!("/feedback/{missing}/comments")))
        .bearer_auth(&user)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_an_application_removes_its_feedback() {
    let srv = TestServer::spawn().await;
    let (_, admin) = srv.user(true).await;
    let (id, api_key) = srv.application(&admin, "doomed").await;
    let fid = srv.submit_ok(&api_key, "bye").await;

    let res = srv
        .client
        .delete(srv.url(&format!("/applications/{id}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv
        .client
        .get(srv.url(&format!("/feedback/{fid}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = srv.submit(&api_key, json!({ "content": "still there?" })).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv
        .client
        .delete(srv.url(&format!("/applications/{id}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

/// Every call fails the way a dropped database connection would.
fn connection_refused<T>() -> StoreResult<T> {
    Err(StoreError::Storage("connection refused".into()))
}

struct UnreachableUsers;

#[async_trait::async_trait]
impl UserStore for UnreachableUsers {
    async fn upsert_from_claims(&self, _: &IdentityClaims, _: DateTime<Utc>) -> StoreResult<LocalUser> {
        connection_refused()
    }

    async fn get_user(&self, _: UserId) -> StoreResult<Option<LocalUser>> {
        connection_refused()
    }

    async fn set_flags(&self, _: UserId, _: bool, _: bool) -> StoreResult<()> {
        connection_refused()
    }
}

struct UnreachableApplications;

#[async_trait::async_trait]
impl ApplicationStore for UnreachableApplications {
    async fn insert_application(&self, _: Application) -> StoreResult<Application> {
        connection_refused()
    }

    async fn list_applications(&self) -> StoreResult<Vec<Application>> {
        connection_refused()
    }

    async fn get_application(&self, _: ApplicationId) -> StoreResult<Option<Application>> {
        connection_refused()
    }

    async fn find_by_api_key(&self, _: &str) -> StoreResult<Option<Application>> {
        connection_refused()
    }

    async fn update_application(
        &self,
        _: ApplicationId,
        _: &ApplicationPatch,
        _: DateTime<Utc>,
    ) -> StoreResult<Application> {
        connection_refused()
    }

    async fn replace_api_key(&self, _: ApplicationId, _: &ApiKey, _: DateTime<Utc>) -> StoreResult<()> {
        connection_refused()
    }

    async fn delete_application(&self, _: ApplicationId) -> StoreResult<()> {
        connection_refused()
    }

    async fn list_categories(&self, _: ApplicationId) -> StoreResult<Vec<Category>> {
        connection_refused()
    }

    async fn get_category(&self, _: ApplicationId, _: CategoryId) -> StoreResult<Option<Category>> {
        connection_refused()
    }

    async fn insert_category(&self, _: ApplicationId, _: NewCategory, _: DateTime<Utc>) -> StoreResult<Category> {
        connection_refused()
    }
}

#[tokio::test]
async fn user_store_outage_falls_back_to_token_identity() {
    let mut services = in_memory_services();
    services.users = Arc::new(UnreachableUsers);
    let srv = TestServer::spawn_with(services).await;

    let sub = UserId::new();
    let token = mint_jwt(SIGNING_KEY, sub, ChronoDuration::minutes(10));

    let res = srv.client.get(srv.url("/auth/me")).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["user_id"], sub.to_string());
    assert_eq!(body["role"], "user");

    let res = srv.client.get(srv.url("/feedback")).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv.client.get(srv.url("/applications")).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_of(res).await, "Forbidden");
}

#[tokio::test]
async fn application_store_outage_is_an_opaque_500() {
    let mut services = in_memory_services();
    services.applications = Arc::new(UnreachableApplications);
    let srv = TestServer::spawn_with(services).await;

    let res = srv.submit("fb_anything", json!({ "content": "hello" })).await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Internal server error" }));
}

#[tokio::test]
async fn head_is_allowed_wherever_get_is() {
    let srv = TestServer::spawn().await;
    let (_, user) = srv.user(false).await;

    let res = srv.client.head(srv.url("/feedback")).bearer_auth(&user).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv.client.head(srv.url("/applications")).bearer_auth(&user).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}
