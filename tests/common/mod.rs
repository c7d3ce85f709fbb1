#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use tower::ServiceExt;
use uuid::Uuid;

use agora::app::auth::AuthService;
use agora::config::decode_key_32;
use agora::domain::notification::{NewNotification, Notification};
use agora::infra::memory::MemoryStore;
use agora::infra::store::{NotificationSink, Store, StoreError};
use agora::AppState;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

// "0123456789abcdef0123456789abcdef" (32 bytes), test-only
const TEST_PASETO_ACCESS_KEY: &str = "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=";
const TEST_ACCESS_TTL_MINUTES: u64 = 15;

// ---------------------------------------------------------------------------
// TestApp: shared, lazily initialized once per test binary
// ---------------------------------------------------------------------------

pub struct TestApp {
    router: Router,
    pub store: Arc<MemoryStore>,
    pub state: AppState,
}

pub struct TestResponse {
    pub status: StatusCode,
    body_bytes: bytes::Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body_bytes).unwrap_or(Value::Null)
    }

    pub fn error_message(&self) -> String {
        self.json()["error"].as_str().unwrap_or("").to_string()
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub username: String,
    pub access_token: String,
}

/// Rejects every write; stands in for an unreachable notification backend.
pub struct FailingSink;

#[async_trait]
impl NotificationSink for FailingSink {
    async fn record(&self, _notification: NewNotification) -> Result<Notification, StoreError> {
        Err(StoreError::Unavailable("notification backend offline".into()))
    }
}

static TEST_APP: OnceCell<TestApp> = OnceCell::const_new();

/// Get (or lazily create) the shared TestApp instance.
pub async fn app() -> &'static TestApp {
    TEST_APP.get_or_init(|| async { TestApp::new(None) }).await
}

impl TestApp {
    /// A fresh app over its own memory store. `sink` replaces the store as the
    /// notification destination when given.
    pub fn new(sink: Option<Arc<dyn NotificationSink>>) -> Self {
        let key = decode_key_32("PASETO_ACCESS_KEY", TEST_PASETO_ACCESS_KEY)
            .expect("test key must decode to 32 bytes");

        let store = Arc::new(MemoryStore::new());
        let notifications: Arc<dyn NotificationSink> = match sink {
            Some(sink) => sink,
            None => store.clone(),
        };
        let state = AppState {
            store: store.clone(),
            notifications,
            auth: AuthService::new(key, TEST_ACCESS_TTL_MINUTES),
        };

        let router = agora::http::router(state.clone());

        TestApp {
            router,
            store,
            state,
        }
    }

    // ------------------------------------------------------------------
    // Low-level request helper
    // ------------------------------------------------------------------
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("host", "localhost");

        for &(key, value) in headers {
            builder = builder.header(key, value);
        }

        let request = if let Some(body) = body {
            builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap()
        } else {
            builder.body(Body::empty()).unwrap()
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot failed");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to collect body")
            .to_bytes();

        TestResponse { status, body_bytes }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let auth;
        let mut headers = vec![];
        if let Some(t) = token {
            auth = format!("Bearer {}", t);
            headers.push(("Authorization", auth.as_str()));
        }
        self.request(method, path, body, &headers).await
    }

    // ------------------------------------------------------------------
    // Convenience HTTP helpers
    // ------------------------------------------------------------------
    pub async fn get(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.send(Method::GET, path, None, token).await
    }

    pub async fn post_json(&self, path: &str, body: Value, token: Option<&str>) -> TestResponse {
        self.send(Method::POST, path, Some(body), token).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.send(Method::POST, path, None, token).await
    }

    pub async fn patch_json(&self, path: &str, body: Value, token: Option<&str>) -> TestResponse {
        self.send(Method::PATCH, path, Some(body), token).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.send(Method::DELETE, path, None, token).await
    }

    // ------------------------------------------------------------------
    // Test data helpers
    // ------------------------------------------------------------------

    /// Create a user directly in the store and mint an access token for it.
    pub async fn create_user(&self, suffix: &str) -> TestUser {
        // Usernames are unique across the shared store.
        let username = format!("{}_{}", suffix, Uuid::new_v4().simple());
        let user = self
            .store
            .create_user(&username)
            .await
            .expect("insert test user failed");
        let access_token = self
            .state
            .auth
            .issue_access_token(user.id)
            .expect("issue access token failed");

        TestUser {
            id: user.id,
            username,
            access_token,
        }
    }

    /// Create a post through the API and return its id.
    pub async fn create_post(&self, author: &TestUser, title: &str) -> Uuid {
        let resp = self
            .post_json(
                "/v1/posts",
                json!({ "title": title, "content": format!("{} body", title) }),
                Some(&author.access_token),
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED, "create_post failed");
        resp.json()["id"]
            .as_str()
            .and_then(|id| Uuid::parse_str(id).ok())
            .expect("post id missing")
    }

    pub async fn follow(&self, follower: &TestUser, followee: &TestUser) {
        let resp = self
            .post(
                &format!("/v1/users/{}/follow", followee.id),
                Some(&follower.access_token),
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED, "follow failed");
    }

    pub async fn notifications(&self, user: &TestUser) -> Vec<Value> {
        let resp = self
            .get("/v1/notifications?limit=100", Some(&user.access_token))
            .await;
        assert_eq!(resp.status, StatusCode::OK);
        resp.json()["items"].as_array().cloned().unwrap_or_default()
    }
}
