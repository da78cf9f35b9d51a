//! Sharing group handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use subtrack_core::types::id::{GroupId, SubscriptionId, UserId};
use subtrack_entity::group::{SharingGroup, SplitConfig};

use crate::dto::request::{AddMemberRequest, CreateGroupRequest};
use crate::dto::response::ApiResponse;
use crate::error::ApiError;
use crate::extractors::{ApiJson, ApiPath, AuthUser, ValidatedJson};
use crate::handlers::access::member_group;
use crate::state::AppState;

/// POST /api/sharing-groups
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateGroupRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SharingGroup>>), ApiError> {
    let group = state.group_service.create_group(&auth, &req.name).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(group))))
}

/// GET /api/sharing-groups/{id}
pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(group_id): ApiPath<GroupId>,
) -> Result<Json<ApiResponse<SharingGroup>>, ApiError> {
    let group = member_group(&state, &auth, group_id).await?;
    Ok(Json(ApiResponse::ok(group)))
}

/// POST /api/sharing-groups/{id}/members
pub async fn add_member(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(group_id): ApiPath<GroupId>,
    ApiJson(req): ApiJson<AddMemberRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SharingGroup>>), ApiError> {
    state
        .group_service
        .add_member(&auth, group_id, req.user_id, req.role)
        .await?;
    let group = state.group_service.get(group_id).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(group))))
}

/// DELETE /api/sharing-groups/{id}/members/{user_id}
pub async fn remove_member(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath((group_id, user_id)): ApiPath<(GroupId, UserId)>,
) -> Result<Json<ApiResponse<SharingGroup>>, ApiError> {
    state
        .group_service
        .remove_member(&auth, group_id, user_id)
        .await?;
    let group = state.group_service.get(group_id).await?;
    Ok(Json(ApiResponse::ok(group)))
}

/// PUT /api/sharing-groups/{id}/subscriptions/{sub_id}/split
pub async fn configure_split(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath((group_id, subscription_id)): ApiPath<(GroupId, SubscriptionId)>,
    ApiJson(config): ApiJson<SplitConfig>,
) -> Result<Json<ApiResponse<SharingGroup>>, ApiError> {
    let group = state
        .group_service
        .configure_split(&auth, group_id, subscription_id, config)
        .await?;
    Ok(Json(ApiResponse::ok(group)))
}
