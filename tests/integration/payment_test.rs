//! Integration tests for cost splits and shared payment tracking.

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::{Value, json};

use subtrack_core::types::id::UserId;
use subtrack_entity::job::{JobPayload, JobPriority};
use subtrack_worker::queue::MAINTENANCE_QUEUE;

use crate::helpers::{Caller, TestApp, rfc3339};

struct Household {
    owner: UserId,
    members: Vec<UserId>,
    group_id: String,
    subscription_id: String,
}

async fn household(app: &TestApp) -> Household {
    let owner = UserId::new();
    let members = vec![UserId::new(), UserId::new(), UserId::new()];
    let subscription = app
        .track_subscription(owner, "YouTube Premium", Duration::days(20))
        .await;
    let subscription_id = subscription["id"].as_str().unwrap().to_string();
    let group_id = app.create_group(owner, &members).await;
    app.share_equally(owner, &group_id, &subscription_id).await;
    Household {
        owner,
        members,
        group_id,
        subscription_id,
    }
}

async fn allocate(app: &TestApp, h: &Household, price: f64, due_in: Duration) -> Vec<Value> {
    let response = app
        .request(
            "POST",
            "/api/payment-tracking/allocate",
            Some(json!({
                "group_id": h.group_id,
                "subscription_id": h.subscription_id,
                "price": price,
                "currency": "USD",
                "due_date": Utc::now() + due_in,
            })),
            Caller::User(h.owner),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    response.data().as_array().unwrap().clone()
}

fn amounts(payments: &[Value]) -> Vec<f64> {
    payments
        .iter()
        .map(|p| p["amount"].as_f64().unwrap())
        .collect()
}

#[tokio::test]
async fn test_equal_split_and_member_removal() {
    let app = TestApp::new();
    let h = household(&app).await;

    let first = allocate(&app, &h, 40.0, Duration::days(7)).await;
    assert_eq!(first.len(), 4);
    assert!(amounts(&first).iter().all(|a| (a - 10.0).abs() < 1e-9));

    let removed = app
        .request(
            "DELETE",
            &format!("/api/sharing-groups/{}/members/{}", h.group_id, h.members[2]),
            None,
            Caller::User(h.owner),
        )
        .await;
    assert_eq!(removed.status, StatusCode::OK);

    let second = allocate(&app, &h, 40.0, Duration::days(37)).await;
    assert_eq!(second.len(), 3);
    assert!(amounts(&second).iter().all(|a| (a - 40.0 / 3.0).abs() < 0.01));

    // Earlier payments keep their amounts.
    let start = rfc3339(Utc::now());
    let end = rfc3339(Utc::now() + Duration::days(60));
    let summary = app
        .request(
            "GET",
            &format!(
                "/api/payment-tracking/group/{}/summary?start={start}&end={end}",
                h.group_id
            ),
            None,
            Caller::User(h.members[0]),
        )
        .await;
    assert_eq!(summary.status, StatusCode::OK, "{}", summary.body);
    assert_eq!(summary.data()["pending_count"], 7);
    assert!((summary.data()["total_expected"].as_f64().unwrap() - 80.0).abs() < 0.01);
}

#[tokio::test]
async fn test_percentage_split_must_sum_to_hundred() {
    let app = TestApp::new();
    let h = household(&app).await;
    let path = format!(
        "/api/sharing-groups/{}/subscriptions/{}/split",
        h.group_id, h.subscription_id
    );

    let bad = app
        .request(
            "PUT",
            &path,
            Some(json!({
                "split_type": "percentage",
                "entries": [
                    { "user_id": h.owner, "percentage": 50.0 },
                    { "user_id": h.members[0], "percentage": 40.0 },
                ],
            })),
            Caller::User(h.owner),
        )
        .await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);

    let by_member = app
        .request(
            "PUT",
            &path,
            Some(json!({ "split_type": "equal" })),
            Caller::User(h.members[0]),
        )
        .await;
    assert_eq!(by_member.status, StatusCode::FORBIDDEN);

    let good = app
        .request(
            "PUT",
            &path,
            Some(json!({
                "split_type": "percentage",
                "entries": [
                    { "user_id": h.owner, "percentage": 60.0 },
                    { "user_id": h.members[0], "percentage": 40.0 },
                ],
            })),
            Caller::User(h.owner),
        )
        .await;
    assert_eq!(good.status, StatusCode::OK, "{}", good.body);

    let payments = allocate(&app, &h, 50.0, Duration::days(7)).await;
    let mut shares = amounts(&payments);
    shares.sort_by(f64::total_cmp);
    assert_eq!(shares, vec![20.0, 30.0]);
}

#[tokio::test]
async fn test_overdue_sweep_then_mark_paid() {
    let app = TestApp::new();
    let h = household(&app).await;
    let payer = h.members[0];

    let created = app
        .request(
            "POST",
            "/api/payment-tracking",
            Some(json!({
                "group_id": h.group_id,
                "subscription_id": h.subscription_id,
                "payer_id": payer,
                "amount": 10.0,
                "currency": "USD",
                "due_date": Utc::now() - Duration::days(1),
            })),
            Caller::User(h.owner),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    let id = created.data()["id"].as_str().unwrap().to_string();
    assert_eq!(created.data()["status"], "pending");

    let forbidden = app
        .request(
            "POST",
            "/api/payment-tracking/check-overdue",
            None,
            Caller::User(h.owner),
        )
        .await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

    let sweep = app
        .request(
            "POST",
            "/api/payment-tracking/check-overdue",
            None,
            Caller::Admin(UserId::new()),
        )
        .await;
    assert_eq!(sweep.data()["affected"], 1);

    let again = app
        .request(
            "POST",
            "/api/payment-tracking/check-overdue",
            None,
            Caller::Admin(UserId::new()),
        )
        .await;
    assert_eq!(again.data()["affected"], 0);

    let overdue = app.notifications(payer, "?kind=payment_overdue").await;
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0]["priority"], "high");

    let paid = app
        .request(
            "PUT",
            &format!("/api/payment-tracking/{id}/mark-paid"),
            Some(json!({ "payment_method": "card" })),
            Caller::User(payer),
        )
        .await;
    assert_eq!(paid.status, StatusCode::OK, "{}", paid.body);
    assert_eq!(paid.data()["status"], "paid");
    assert_eq!(paid.data()["payment_method"], "card");
    assert!(paid.data()["paid_date"].is_string());

    let twice = app
        .request(
            "PUT",
            &format!("/api/payment-tracking/{id}/mark-paid"),
            None,
            Caller::User(payer),
        )
        .await;
    assert_eq!(twice.status, StatusCode::CONFLICT);

    let remind = app
        .request(
            "POST",
            &format!("/api/payment-tracking/{id}/remind"),
            None,
            Caller::User(h.owner),
        )
        .await;
    assert_eq!(remind.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_status_transitions() {
    let app = TestApp::new();
    let h = household(&app).await;
    let payments = allocate(&app, &h, 40.0, Duration::days(7)).await;
    let id = payments[0]["id"].as_str().unwrap().to_string();
    let path = format!("/api/payment-tracking/{id}/status");

    let pending = app
        .request(
            "PUT",
            &path,
            Some(json!({ "status": "pending" })),
            Caller::User(h.owner),
        )
        .await;
    assert_eq!(pending.status, StatusCode::BAD_REQUEST);

    // Due in a week, so not overdue yet.
    let overdue = app
        .request(
            "PUT",
            &path,
            Some(json!({ "status": "overdue" })),
            Caller::User(h.owner),
        )
        .await;
    assert_eq!(overdue.status, StatusCode::BAD_REQUEST);

    let cancelled = app
        .request(
            "PUT",
            &path,
            Some(json!({ "status": "cancelled" })),
            Caller::User(h.owner),
        )
        .await;
    assert_eq!(cancelled.status, StatusCode::OK);
    assert_eq!(cancelled.data()["status"], "cancelled");

    let paid = app
        .request(
            "PUT",
            &path,
            Some(json!({ "status": "paid" })),
            Caller::User(h.owner),
        )
        .await;
    assert_eq!(paid.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_remind_notifies_payer() {
    let app = TestApp::new();
    let h = household(&app).await;
    let payments = allocate(&app, &h, 40.0, Duration::days(3)).await;
    let payment = payments
        .iter()
        .find(|p| p["payer_id"] == json!(h.members[1]))
        .unwrap();
    let id = payment["id"].as_str().unwrap();

    let response = app
        .request(
            "POST",
            &format!("/api/payment-tracking/{id}/remind"),
            None,
            Caller::User(h.owner),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["reminders_sent"], 1);
    assert_eq!(response.data()["status"], "pending");
    let due = app.notifications(h.members[1], "?kind=payment_due").await;
    assert_eq!(due.len(), 1);
    assert_eq!(due[0]["priority"], "medium");
}

#[tokio::test]
async fn test_outsiders_cannot_see_group_payments() {
    let app = TestApp::new();
    let h = household(&app).await;
    let payments = allocate(&app, &h, 40.0, Duration::days(3)).await;
    let id = payments[0]["id"].as_str().unwrap();

    let response = app
        .request(
            "POST",
            &format!("/api/payment-tracking/{id}/remind"),
            None,
            Caller::User(UserId::new()),
        )
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_background_overdue_sweep() {
    let app = TestApp::new();
    let h = household(&app).await;
    allocate(&app, &h, 40.0, -Duration::hours(2)).await;

    app.queue
        .enqueue_payload(&JobPayload::OverdueSweep, MAINTENANCE_QUEUE, JobPriority::High, None)
        .await
        .unwrap();
    assert_eq!(app.runner.drain().await.unwrap(), 1);

    for payer in std::iter::once(h.owner).chain(h.members.iter().copied()) {
        let overdue = app.notifications(payer, "?kind=payment_overdue").await;
        assert_eq!(overdue.len(), 1);
    }
}
