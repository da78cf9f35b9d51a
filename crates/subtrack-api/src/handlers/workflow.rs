//! Reminder workflow handlers.

use axum::Json;
use axum::extract::State;
use chrono::Utc;

use subtrack_core::types::id::SubscriptionId;
use subtrack_service::reminder::WorkflowStatus;

use crate::dto::response::ApiResponse;
use crate::error::ApiError;
use crate::extractors::{ApiPath, AuthUser};
use crate::handlers::access::owned_subscription;
use crate::state::AppState;

/// POST /api/subscriptions/{id}/workflow-retrigger
pub async fn retrigger(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<SubscriptionId>,
) -> Result<Json<ApiResponse<WorkflowStatus>>, ApiError> {
    owned_subscription(&state, &auth, id).await?;
    let status = state.reminder_coordinator.retrigger(id, Utc::now()).await?;
    Ok(Json(ApiResponse::ok(status)))
}

/// POST /api/subscriptions/{id}/workflow-cancel
pub async fn cancel(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<SubscriptionId>,
) -> Result<Json<ApiResponse<WorkflowStatus>>, ApiError> {
    owned_subscription(&state, &auth, id).await?;
    state.reminder_coordinator.cancel(id, Utc::now()).await?;
    let status = state.reminder_coordinator.status(id).await?;
    Ok(Json(ApiResponse::ok(status)))
}

/// GET /api/subscriptions/{id}/workflow-status
pub async fn status(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<SubscriptionId>,
) -> Result<Json<ApiResponse<WorkflowStatus>>, ApiError> {
    owned_subscription(&state, &auth, id).await?;
    let status = state.reminder_coordinator.status(id).await?;
    Ok(Json(ApiResponse::ok(status)))
}
