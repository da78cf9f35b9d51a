//! Integration tests for payment-provider webhooks.

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::json;

use subtrack_core::types::id::{SubscriptionId, UserId};

use crate::helpers::{Caller, TestApp};

#[tokio::test]
async fn test_success_settles_tracked_payment_once() {
    let app = TestApp::new();
    let owner = UserId::new();
    let payer = UserId::new();
    let subscription = app
        .track_subscription(owner, "Spotify Family", Duration::days(10))
        .await;
    let subscription_id = subscription["id"].as_str().unwrap();
    let group_id = app.create_group(owner, &[payer]).await;
    app.share_equally(owner, &group_id, subscription_id).await;

    let created = app
        .request(
            "POST",
            "/api/payment-tracking",
            Some(json!({
                "group_id": group_id,
                "subscription_id": subscription_id,
                "payer_id": payer,
                "amount": 8.5,
                "currency": "USD",
                "due_date": Utc::now() + Duration::days(5),
            })),
            Caller::User(owner),
        )
        .await;
    let payment_id = created.data()["id"].as_str().unwrap().to_string();

    let event = json!({
        "type": "payment_succeeded",
        "subscription_id": subscription_id,
        "payment_id": payment_id,
        "amount": 8.5,
        "currency": "USD",
        "payment_method": "paypal",
    });

    let first = app
        .request("POST", "/api/webhooks/payments", Some(event.clone()), Caller::Anonymous)
        .await;
    assert_eq!(first.status, StatusCode::OK, "{}", first.body);
    assert_eq!(first.data()["result"], "payment_settled");

    let second = app
        .request("POST", "/api/webhooks/payments", Some(event), Caller::Anonymous)
        .await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.data()["result"], "already_settled");

    let success = app.notifications(payer, "?kind=payment_success").await;
    assert_eq!(success.len(), 1);
    assert_eq!(success[0]["priority"], "low");
}

#[tokio::test]
async fn test_payment_for_another_subscription_rejected() {
    let app = TestApp::new();
    let owner = UserId::new();
    let payer = UserId::new();
    let shared = app
        .track_subscription(owner, "Spotify Family", Duration::days(10))
        .await;
    let shared_id = shared["id"].as_str().unwrap();
    let other = app.track_subscription(owner, "Hulu", Duration::days(3)).await;
    let group_id = app.create_group(owner, &[payer]).await;
    app.share_equally(owner, &group_id, shared_id).await;

    let created = app
        .request(
            "POST",
            "/api/payment-tracking",
            Some(json!({
                "group_id": group_id,
                "subscription_id": shared_id,
                "payer_id": payer,
                "amount": 8.5,
                "currency": "USD",
                "due_date": Utc::now() + Duration::days(5),
            })),
            Caller::User(owner),
        )
        .await;
    let payment_id = created.data()["id"].as_str().unwrap().to_string();

    let response = app
        .request(
            "POST",
            "/api/webhooks/payments",
            Some(json!({
                "type": "payment_succeeded",
                "subscription_id": other["id"],
                "payment_id": payment_id,
                "amount": 8.5,
                "currency": "USD",
            })),
            Caller::Anonymous,
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(app.notifications(payer, "?kind=payment_success").await.is_empty());
}

#[tokio::test]
async fn test_failure_notifies_owner() {
    let app = TestApp::new();
    let owner = UserId::new();
    let subscription = app
        .track_subscription(owner, "Dropbox", Duration::days(10))
        .await;

    let response = app
        .request(
            "POST",
            "/api/webhooks/payments",
            Some(json!({
                "type": "payment_failed",
                "subscription_id": subscription["id"],
                "amount": 11.99,
                "currency": "USD",
                "reason": "card declined",
            })),
            Caller::Anonymous,
        )
        .await;

    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(response.data()["result"], "notified");
    let notification = &response.data()["notification"]["notification"];
    assert_eq!(notification["kind"], "payment_failed");
    assert_eq!(notification["priority"], "high");
    assert_eq!(notification["user_id"], json!(owner));
}

#[tokio::test]
async fn test_unknown_subscription() {
    let app = TestApp::new();

    let response = app
        .request(
            "POST",
            "/api/webhooks/payments",
            Some(json!({
                "type": "payment_failed",
                "subscription_id": SubscriptionId::new(),
                "amount": 1.0,
                "currency": "USD",
            })),
            Caller::Anonymous,
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_event_type_rejected() {
    let app = TestApp::new();

    let response = app
        .request(
            "POST",
            "/api/webhooks/payments",
            Some(json!({ "type": "refund_issued", "subscription_id": SubscriptionId::new() })),
            Caller::Anonymous,
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}
