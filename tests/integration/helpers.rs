//! Shared test helpers for integration tests.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, Duration, Utc};
use serde_json::{Value, json};
use tower::ServiceExt;

use subtrack_api::{AppState, build_app};
use subtrack_core::config::{AppConfig, StorageProvider};
use subtrack_core::types::id::UserId;
use subtrack_database::Storage;
use subtrack_worker::{JobQueue, JobQueueScheduler, WorkerRunner, default_executor};

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Services and storage behind the router
    pub state: AppState,
    /// Job queue shared with the reminder scheduler
    pub queue: Arc<JobQueue>,
    /// Runs due background jobs inline
    pub runner: WorkerRunner,
}

/// Caller identity for a test request.
#[derive(Debug, Clone, Copy)]
pub enum Caller {
    Anonymous,
    User(UserId),
    Admin(UserId),
}

/// Test response
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestResponse {
    /// The `data` field of a success envelope.
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }
}

impl TestApp {
    /// Create a new test application over fresh in-memory storage
    pub fn new() -> Self {
        let mut config = AppConfig::default();
        config.database.provider = StorageProvider::Memory;

        let storage = Storage::in_memory();
        let queue = Arc::new(JobQueue::new(Arc::clone(&storage.jobs), "test-worker"));
        let scheduler = Arc::new(JobQueueScheduler::new(Arc::clone(&queue)));
        let state = AppState::new(config.clone(), storage, scheduler);

        let executor = Arc::new(default_executor(
            Arc::clone(&state.reminder_coordinator),
            Arc::clone(&state.payment_tracker),
            Arc::clone(&state.generator),
            Arc::clone(&queue),
            config.worker.job_retention_days,
        ));
        let runner = WorkerRunner::new(Arc::clone(&queue), executor, config.worker.clone());

        Self {
            router: build_app(state.clone()),
            state,
            queue,
            runner,
        }
    }

    /// Send a JSON request through the router
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        caller: Caller,
    ) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json");

        match caller {
            Caller::Anonymous => {}
            Caller::User(user) => req = req.header("X-User-Id", user.to_string()),
            Caller::Admin(user) => {
                req = req
                    .header("X-User-Id", user.to_string())
                    .header("X-Admin", "true");
            }
        }

        let req = req
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }

    /// Track a monthly subscription renewing `renews_in` from now.
    pub async fn track_subscription(&self, owner: UserId, name: &str, renews_in: Duration) -> Value {
        let now = Utc::now();
        let response = self
            .request(
                "POST",
                "/api/subscriptions",
                Some(json!({
                    "name": name,
                    "price": 9.99,
                    "currency": "USD",
                    "frequency": "monthly",
                    "start_date": now - Duration::days(20),
                    "renewal_date": now + renews_in,
                })),
                Caller::User(owner),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.data()["subscription"].clone()
    }

    /// Create a group owned by `owner` with `members` added as plain members.
    pub async fn create_group(&self, owner: UserId, members: &[UserId]) -> String {
        let response = self
            .request(
                "POST",
                "/api/sharing-groups",
                Some(json!({ "name": "Household" })),
                Caller::User(owner),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        let group_id = response.data()["id"].as_str().unwrap().to_string();

        for member in members {
            let response = self
                .request(
                    "POST",
                    &format!("/api/sharing-groups/{group_id}/members"),
                    Some(json!({ "user_id": member })),
                    Caller::User(owner),
                )
                .await;
            assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        }
        group_id
    }

    /// Share a subscription in a group with an equal split.
    pub async fn share_equally(&self, owner: UserId, group_id: &str, subscription_id: &str) {
        let response = self
            .request(
                "PUT",
                &format!("/api/sharing-groups/{group_id}/subscriptions/{subscription_id}/split"),
                Some(json!({ "split_type": "equal" })),
                Caller::User(owner),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    }

    /// Notifications of a user, newest first.
    pub async fn notifications(&self, user: UserId, query: &str) -> Vec<Value> {
        let response = self
            .request(
                "GET",
                &format!("/api/notifications{query}"),
                None,
                Caller::User(user),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        response.data()["items"].as_array().cloned().unwrap_or_default()
    }
}

/// RFC 3339 string for JSON bodies and query strings.
pub fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}
