//! Shared payment tracking handlers.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::Utc;
use validator::Validate;

use subtrack_core::error::AppError;
use subtrack_core::types::id::{GroupId, PaymentId};
use subtrack_entity::payment::{CreatePayment, Payment, PaymentSummary};

use crate::dto::request::{
    AllocatePeriodRequest, CreatePaymentRequest, MarkPaidRequest, SummaryQuery,
    UpdatePaymentStatusRequest,
};
use crate::dto::response::{AffectedResponse, ApiResponse};
use crate::error::ApiError;
use crate::extractors::{AdminUser, ApiJson, ApiPath, ApiQuery, AuthUser, ValidatedJson};
use crate::handlers::access::{member_group, visible_payment};
use crate::state::AppState;

/// POST /api/payment-tracking
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Payment>>), ApiError> {
    require_manager(&state, &auth, req.group_id).await?;
    let payment = state
        .payment_tracker
        .create(CreatePayment::from(req), Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(payment))))
}

/// POST /api/payment-tracking/allocate
pub async fn allocate(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<AllocatePeriodRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<Payment>>>), ApiError> {
    require_manager(&state, &auth, req.group_id).await?;
    let payments = state
        .payment_tracker
        .allocate_period(req.into(), Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(payments))))
}

/// PUT /api/payment-tracking/{id}/mark-paid
pub async fn mark_paid(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<PaymentId>,
    body: Bytes,
) -> Result<Json<ApiResponse<Payment>>, ApiError> {
    visible_payment(&state, &auth, id).await?;
    let req = parse_optional_body::<MarkPaidRequest>(&body)?;
    let payment = state
        .payment_tracker
        .mark_paid(id, req.payment_method, Utc::now())
        .await?;
    Ok(Json(ApiResponse::ok(payment)))
}

/// PUT /api/payment-tracking/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<PaymentId>,
    ApiJson(req): ApiJson<UpdatePaymentStatusRequest>,
) -> Result<Json<ApiResponse<Payment>>, ApiError> {
    let payment = visible_payment(&state, &auth, id).await?;
    require_manager(&state, &auth, payment.group_id).await?;
    let payment = state
        .payment_tracker
        .update_status(id, req.status, Utc::now())
        .await?;
    Ok(Json(ApiResponse::ok(payment)))
}

/// POST /api/payment-tracking/{id}/remind
pub async fn remind(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<PaymentId>,
) -> Result<Json<ApiResponse<Payment>>, ApiError> {
    visible_payment(&state, &auth, id).await?;
    let payment = state.payment_tracker.remind(id, Utc::now()).await?;
    Ok(Json(ApiResponse::ok(payment)))
}

/// POST /api/payment-tracking/check-overdue
pub async fn check_overdue(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<ApiResponse<AffectedResponse>>, ApiError> {
    let affected = state.payment_tracker.sweep_overdue(Utc::now()).await?;
    Ok(Json(ApiResponse::ok(AffectedResponse { affected })))
}

/// GET /api/payment-tracking/group/{id}/summary
pub async fn summary(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(group_id): ApiPath<GroupId>,
    ApiQuery(range): ApiQuery<SummaryQuery>,
) -> Result<Json<ApiResponse<PaymentSummary>>, ApiError> {
    member_group(&state, &auth, group_id).await?;
    let summary = state
        .payment_tracker
        .summarize(group_id, range.start, range.end)
        .await?;
    Ok(Json(ApiResponse::ok(summary)))
}

async fn require_manager(
    state: &AppState,
    auth: &AuthUser,
    group_id: GroupId,
) -> Result<(), AppError> {
    let group = member_group(state, auth, group_id).await?;
    if !auth.is_admin && !group.can_manage(auth.user_id) {
        return Err(AppError::authorization(
            "Only group owners and admins can change payments",
        ));
    }
    Ok(())
}

/// The body is optional: an empty one means all defaults.
fn parse_optional_body<T>(body: &Bytes) -> Result<T, AppError>
where
    T: Default + serde::de::DeserializeOwned + Validate,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    let value: T = serde_json::from_slice(body)
        .map_err(|e| AppError::validation(format!("Invalid JSON body: {e}")))?;
    value
        .validate()
        .map_err(|e| AppError::validation(format!("Invalid request: {e}")))?;
    Ok(value)
}
