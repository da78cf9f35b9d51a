//! Integration tests for subscription tracking and reminder workflows.

use axum::http::StatusCode;
use chrono::Duration;
use serde_json::json;

use subtrack_core::types::id::UserId;

use crate::helpers::{Caller, TestApp};

#[tokio::test]
async fn test_tracking_notifies_and_schedules() {
    let app = TestApp::new();
    let owner = UserId::new();

    let subscription = app
        .track_subscription(owner, "Netflix", Duration::days(10))
        .await;
    let id = subscription["id"].as_str().unwrap();

    let notifications = app.notifications(owner, "").await;
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0]["kind"], "subscription_added");
    assert_eq!(notifications[0]["priority"], "low");

    let status = app
        .request(
            "GET",
            &format!("/api/subscriptions/{id}/workflow-status"),
            None,
            Caller::User(owner),
        )
        .await;
    assert_eq!(status.status, StatusCode::OK);
    assert_eq!(status.data()["has_handle"], true);
    assert_eq!(status.data()["scheduler_status"], "pending");
    assert!(status.data()["next_fire_at"].is_string());
}

#[tokio::test]
async fn test_retrigger_fires_due_renewal_reminder() {
    let app = TestApp::new();
    let owner = UserId::new();
    let subscription = app
        .track_subscription(owner, "Netflix", Duration::days(1))
        .await;
    let id = subscription["id"].as_str().unwrap();

    let response = app
        .request(
            "POST",
            &format!("/api/subscriptions/{id}/workflow-retrigger"),
            None,
            Caller::User(owner),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(response.data()["has_handle"], true);
    assert!(response.data()["last_evaluated_at"].is_string());

    let renewals = app.notifications(owner, "?kind=renewal").await;
    assert_eq!(renewals.len(), 1);
    assert_eq!(renewals[0]["priority"], "high");
    assert_eq!(renewals[0]["metadata"]["days_until_renewal"], 1);
    assert!(
        renewals[0]["title"]
            .as_str()
            .unwrap()
            .contains("renews tomorrow")
    );

    // Same bucket again: deduplicated.
    app.request(
        "POST",
        &format!("/api/subscriptions/{id}/workflow-retrigger"),
        None,
        Caller::User(owner),
    )
    .await;
    assert_eq!(app.notifications(owner, "?kind=renewal").await.len(), 1);
}

#[tokio::test]
async fn test_cancel_clears_handle() {
    let app = TestApp::new();
    let owner = UserId::new();
    let subscription = app
        .track_subscription(owner, "Hulu", Duration::days(5))
        .await;
    let id = subscription["id"].as_str().unwrap();

    let response = app
        .request(
            "POST",
            &format!("/api/subscriptions/{id}/workflow-cancel"),
            None,
            Caller::User(owner),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["has_handle"], false);

    // Cancelling again is a no-op.
    let again = app
        .request(
            "POST",
            &format!("/api/subscriptions/{id}/workflow-cancel"),
            None,
            Caller::User(owner),
        )
        .await;
    assert_eq!(again.status, StatusCode::OK);
}

#[tokio::test]
async fn test_workflow_routes_require_owner() {
    let app = TestApp::new();
    let owner = UserId::new();
    let subscription = app
        .track_subscription(owner, "Netflix", Duration::days(5))
        .await;
    let id = subscription["id"].as_str().unwrap();
    let path = format!("/api/subscriptions/{id}/workflow-status");

    let stranger = app
        .request("GET", &path, None, Caller::User(UserId::new()))
        .await;
    assert_eq!(stranger.status, StatusCode::FORBIDDEN);

    let admin = app
        .request("GET", &path, None, Caller::Admin(UserId::new()))
        .await;
    assert_eq!(admin.status, StatusCode::OK);

    let missing = app
        .request(
            "GET",
            &format!("/api/subscriptions/{}/workflow-status", UserId::new()),
            None,
            Caller::Admin(UserId::new()),
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_emits_price_and_status_changes() {
    let app = TestApp::new();
    let owner = UserId::new();
    let subscription = app
        .track_subscription(owner, "Spotify", Duration::days(12))
        .await;
    let id = subscription["id"].as_str().unwrap();

    let response = app
        .request(
            "PUT",
            &format!("/api/subscriptions/{id}"),
            Some(json!({
                "name": "Spotify",
                "price": 12.99,
                "currency": "USD",
                "frequency": "monthly",
                "renewal_date": subscription["renewal_date"],
                "status": "cancelled",
            })),
            Caller::User(owner),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(response.data()["subscription"]["status"], "cancelled");
    assert_eq!(
        response.data()["notifications"].as_array().unwrap().len(),
        2
    );

    let price = app.notifications(owner, "?kind=price_change").await;
    assert_eq!(price.len(), 1);
    assert_eq!(price[0]["priority"], "medium");
    let status = app.notifications(owner, "?kind=info").await;
    assert_eq!(status.len(), 1);
    assert_eq!(status[0]["metadata"]["new_status"], "cancelled");

    let workflow = app
        .request(
            "GET",
            &format!("/api/subscriptions/{id}/workflow-status"),
            None,
            Caller::User(owner),
        )
        .await;
    assert_eq!(workflow.data()["has_handle"], false);
}

#[tokio::test]
async fn test_track_rejects_renewal_before_start() {
    let app = TestApp::new();
    let now = chrono::Utc::now();

    let response = app
        .request(
            "POST",
            "/api/subscriptions",
            Some(json!({
                "name": "Broken",
                "price": 5.0,
                "currency": "USD",
                "frequency": "monthly",
                "start_date": now,
                "renewal_date": now - Duration::days(1),
            })),
            Caller::User(UserId::new()),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}
