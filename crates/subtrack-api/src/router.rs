//! Route definitions for the SubTrack HTTP API.
//!
//! Engine routes are mounted under `/api`; `/health` sits at the root.

use axum::{
    Router,
    routing::{get, patch, post, put},
};

use crate::handlers;
use crate::state::AppState;

/// Build the router with every route, without middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(notification_routes())
        .merge(subscription_routes())
        .merge(payment_routes())
        .merge(group_routes())
        .merge(webhook_routes());

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(handlers::health::health))
        .with_state(state)
}

/// Notification listing, read state and deletion
fn notification_routes() -> Router<AppState> {
    use handlers::notification as n;
    Router::new()
        .route("/notifications", post(n::create).get(n::list))
        .route("/notifications/unread/count", get(n::unread_count))
        .route("/notifications/read-all", patch(n::mark_all_read))
        .route("/notifications/bulk/read", patch(n::mark_read_bulk))
        .route("/notifications/all", axum::routing::delete(n::delete_all))
        .route("/notifications/read", axum::routing::delete(n::delete_read))
        .route("/notifications/bulk", axum::routing::delete(n::delete_bulk))
        .route("/notifications/{id}", axum::routing::delete(n::delete))
        .route("/notifications/{id}/read", patch(n::mark_read))
        .route("/notifications/{id}/unread", patch(n::mark_unread))
}

/// Subscription tracking and reminder workflows
fn subscription_routes() -> Router<AppState> {
    Router::new()
        .route("/subscriptions", post(handlers::subscription::track))
        .route("/subscriptions/{id}", put(handlers::subscription::update))
        .route(
            "/subscriptions/{id}/workflow-retrigger",
            post(handlers::workflow::retrigger),
        )
        .route(
            "/subscriptions/{id}/workflow-cancel",
            post(handlers::workflow::cancel),
        )
        .route(
            "/subscriptions/{id}/workflow-status",
            get(handlers::workflow::status),
        )
}

/// Shared payment lifecycle
fn payment_routes() -> Router<AppState> {
    use handlers::payment as p;
    Router::new()
        .route("/payment-tracking", post(p::create))
        .route("/payment-tracking/allocate", post(p::allocate))
        .route("/payment-tracking/check-overdue", post(p::check_overdue))
        .route("/payment-tracking/{id}/mark-paid", put(p::mark_paid))
        .route("/payment-tracking/{id}/status", put(p::update_status))
        .route("/payment-tracking/{id}/remind", post(p::remind))
        .route("/payment-tracking/group/{id}/summary", get(p::summary))
}

/// Sharing groups and cost splits
fn group_routes() -> Router<AppState> {
    use handlers::group as g;
    Router::new()
        .route("/sharing-groups", post(g::create))
        .route("/sharing-groups/{id}", get(g::get))
        .route("/sharing-groups/{id}/members", post(g::add_member))
        .route(
            "/sharing-groups/{id}/members/{user_id}",
            axum::routing::delete(g::remove_member),
        )
        .route(
            "/sharing-groups/{id}/subscriptions/{sub_id}/split",
            put(g::configure_split),
        )
}

/// Payment-provider webhooks
fn webhook_routes() -> Router<AppState> {
    Router::new().route("/webhooks/payments", post(handlers::webhook::payments))
}
