//! Integration tests for the health endpoint.

use axum::http::StatusCode;

use crate::helpers::{Caller, TestApp};

#[tokio::test]
async fn test_health_reports_backend() {
    let app = TestApp::new();

    let response = app.request("GET", "/health", None, Caller::Anonymous).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["status"], "ok");
    assert_eq!(response.data()["storage"], "memory");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = TestApp::new();

    let response = app
        .request("GET", "/api/does-not-exist", None, Caller::Anonymous)
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
