//! Notification handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use subtrack_core::types::id::NotificationId;
use subtrack_core::types::pagination::PageResponse;
use subtrack_entity::notification::{Generated, Notification};

use crate::dto::request::{CreateNotificationRequest, NotificationFilterQuery, NotificationIdsRequest};
use crate::dto::response::{AffectedResponse, ApiResponse, CountResponse};
use crate::error::ApiError;
use crate::extractors::{ApiJson, ApiPath, ApiQuery, AuthUser, PaginationParams, ValidatedJson};
use crate::state::AppState;

/// POST /api/notifications
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<CreateNotificationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Generated>>), ApiError> {
    let generated = state
        .notification_service
        .create(&auth, req.subscription_id, &req.facts)
        .await?;
    let status = match generated {
        Generated::Created(_) => StatusCode::CREATED,
        Generated::Existing(_) => StatusCode::OK,
    };
    Ok((status, Json(ApiResponse::ok(generated))))
}

/// GET /api/notifications
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(page): ApiQuery<PaginationParams>,
    ApiQuery(filter): ApiQuery<NotificationFilterQuery>,
) -> Result<Json<ApiResponse<PageResponse<Notification>>>, ApiError> {
    let result = state
        .notification_service
        .list(&auth, filter.into(), page.into_page_request())
        .await?;
    Ok(Json(ApiResponse::ok(result)))
}

/// GET /api/notifications/unread/count
pub async fn unread_count(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<CountResponse>>, ApiError> {
    let count = state.notification_service.unread_count(&auth).await?;
    Ok(Json(ApiResponse::ok(CountResponse { count })))
}

/// PATCH /api/notifications/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<NotificationId>,
) -> Result<Json<ApiResponse<Notification>>, ApiError> {
    let notification = state.notification_service.mark_read(&auth, id).await?;
    Ok(Json(ApiResponse::ok(notification)))
}

/// PATCH /api/notifications/{id}/unread
pub async fn mark_unread(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<NotificationId>,
) -> Result<Json<ApiResponse<Notification>>, ApiError> {
    let notification = state.notification_service.mark_unread(&auth, id).await?;
    Ok(Json(ApiResponse::ok(notification)))
}

/// PATCH /api/notifications/read-all
pub async fn mark_all_read(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<AffectedResponse>>, ApiError> {
    let affected = state.notification_service.mark_all_read(&auth).await?;
    Ok(Json(ApiResponse::ok(AffectedResponse { affected })))
}

/// PATCH /api/notifications/bulk/read
pub async fn mark_read_bulk(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<NotificationIdsRequest>,
) -> Result<Json<ApiResponse<AffectedResponse>>, ApiError> {
    let affected = state
        .notification_service
        .mark_read_bulk(&auth, &req.ids)
        .await?;
    Ok(Json(ApiResponse::ok(AffectedResponse { affected })))
}

/// DELETE /api/notifications/{id}
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<NotificationId>,
) -> Result<StatusCode, ApiError> {
    state.notification_service.delete(&auth, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/notifications/all
pub async fn delete_all(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<AffectedResponse>>, ApiError> {
    let affected = state.notification_service.delete_all(&auth).await?;
    Ok(Json(ApiResponse::ok(AffectedResponse { affected })))
}

/// DELETE /api/notifications/read
pub async fn delete_read(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<AffectedResponse>>, ApiError> {
    let affected = state.notification_service.delete_read(&auth).await?;
    Ok(Json(ApiResponse::ok(AffectedResponse { affected })))
}

/// DELETE /api/notifications/bulk
pub async fn delete_bulk(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<NotificationIdsRequest>,
) -> Result<Json<ApiResponse<AffectedResponse>>, ApiError> {
    let affected = state
        .notification_service
        .delete_bulk(&auth, &req.ids)
        .await?;
    Ok(Json(ApiResponse::ok(AffectedResponse { affected })))
}
