//! Integration tests for notification creation, listing and read state.

use axum::http::StatusCode;
use serde_json::{Value, json};

use subtrack_core::types::id::UserId;

use crate::helpers::{Caller, TestApp};

fn price_change(old_price: f64, new_price: f64) -> Value {
    json!({
        "facts": {
            "event": "price_change",
            "subscription_name": "Disney+",
            "currency": "USD",
            "old_price": old_price,
            "new_price": new_price,
        }
    })
}

async fn create(app: &TestApp, user: UserId, body: Value) -> (StatusCode, Value) {
    let response = app
        .request("POST", "/api/notifications", Some(body), Caller::User(user))
        .await;
    (response.status, response.body)
}

#[tokio::test]
async fn test_create_is_deduplicated() {
    let app = TestApp::new();
    let user = UserId::new();

    let (status, first) = create(&app, user, price_change(10.0, 12.0)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["data"]["outcome"], "created");
    let notification = &first["data"]["notification"];
    assert_eq!(notification["kind"], "price_change");
    assert_eq!(notification["priority"], "medium");
    assert_eq!(notification["metadata"]["old_price"], 10.0);
    assert_eq!(notification["metadata"]["new_price"], 12.0);

    let (status, second) = create(&app, user, price_change(10.0, 12.0)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["data"]["outcome"], "existing");
    assert_eq!(second["data"]["notification"]["id"], notification["id"]);

    assert_eq!(app.notifications(user, "").await.len(), 1);
}

#[tokio::test]
async fn test_price_decrease_is_low_priority() {
    let app = TestApp::new();
    let user = UserId::new();

    let (_, body) = create(&app, user, price_change(12.0, 10.0)).await;

    assert_eq!(body["data"]["notification"]["priority"], "low");
}

#[tokio::test]
async fn test_invalid_facts_rejected() {
    let app = TestApp::new();
    let user = UserId::new();

    let (status, body) = create(&app, user, price_change(10.0, 10.0)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
    assert!(app.notifications(user, "").await.is_empty());
}

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let app = TestApp::new();

    let response = app
        .request("GET", "/api/notifications", None, Caller::Anonymous)
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_read_state_and_filters() {
    let app = TestApp::new();
    let user = UserId::new();
    let (_, a) = create(&app, user, price_change(10.0, 12.0)).await;
    create(&app, user, price_change(12.0, 15.0)).await;
    let id = a["data"]["notification"]["id"].as_str().unwrap().to_string();

    let count = app
        .request("GET", "/api/notifications/unread/count", None, Caller::User(user))
        .await;
    assert_eq!(count.data()["count"], 2);

    let read = app
        .request(
            "PATCH",
            &format!("/api/notifications/{id}/read"),
            None,
            Caller::User(user),
        )
        .await;
    assert_eq!(read.status, StatusCode::OK);
    assert_eq!(read.data()["read"], true);

    assert_eq!(app.notifications(user, "?read=true").await.len(), 1);
    assert_eq!(app.notifications(user, "?read=false").await.len(), 1);
    assert_eq!(
        app.notifications(user, "?kind=price_change&priority=medium")
            .await
            .len(),
        2
    );

    let unread = app
        .request(
            "PATCH",
            &format!("/api/notifications/{id}/unread"),
            None,
            Caller::User(user),
        )
        .await;
    assert_eq!(unread.data()["read"], false);

    let all = app
        .request("PATCH", "/api/notifications/read-all", None, Caller::User(user))
        .await;
    assert_eq!(all.data()["affected"], 2);
}

#[tokio::test]
async fn test_other_users_notifications_are_invisible() {
    let app = TestApp::new();
    let owner = UserId::new();
    let stranger = UserId::new();
    let (_, body) = create(&app, owner, price_change(10.0, 12.0)).await;
    let id = body["data"]["notification"]["id"].as_str().unwrap().to_string();

    let response = app
        .request(
            "PATCH",
            &format!("/api/notifications/{id}/read"),
            None,
            Caller::User(stranger),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app
        .request(
            "DELETE",
            &format!("/api/notifications/{id}"),
            None,
            Caller::User(stranger),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(app.notifications(owner, "").await.len(), 1);
}

#[tokio::test]
async fn test_bulk_operations() {
    let app = TestApp::new();
    let user = UserId::new();
    let (_, a) = create(&app, user, price_change(10.0, 12.0)).await;
    let (_, b) = create(&app, user, price_change(12.0, 15.0)).await;
    create(&app, user, price_change(15.0, 11.0)).await;
    let ids = vec![
        a["data"]["notification"]["id"].clone(),
        b["data"]["notification"]["id"].clone(),
    ];

    let empty = app
        .request(
            "PATCH",
            "/api/notifications/bulk/read",
            Some(json!({ "ids": [] })),
            Caller::User(user),
        )
        .await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);

    let marked = app
        .request(
            "PATCH",
            "/api/notifications/bulk/read",
            Some(json!({ "ids": ids })),
            Caller::User(user),
        )
        .await;
    assert_eq!(marked.data()["affected"], 2);

    let deleted = app
        .request("DELETE", "/api/notifications/read", None, Caller::User(user))
        .await;
    assert_eq!(deleted.data()["affected"], 2);
    assert_eq!(app.notifications(user, "").await.len(), 1);

    let deleted = app
        .request("DELETE", "/api/notifications/all", None, Caller::User(user))
        .await;
    assert_eq!(deleted.data()["affected"], 1);
}

#[tokio::test]
async fn test_delete_single() {
    let app = TestApp::new();
    let user = UserId::new();
    let (_, body) = create(&app, user, price_change(10.0, 12.0)).await;
    let id = body["data"]["notification"]["id"].as_str().unwrap().to_string();
    let path = format!("/api/notifications/{id}");

    let first = app.request("DELETE", &path, None, Caller::User(user)).await;
    assert_eq!(first.status, StatusCode::NO_CONTENT);

    let second = app.request("DELETE", &path, None, Caller::User(user)).await;
    assert_eq!(second.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_id_is_bad_request() {
    let app = TestApp::new();

    let response = app
        .request(
            "PATCH",
            "/api/notifications/not-a-uuid/read",
            None,
            Caller::User(UserId::new()),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}
