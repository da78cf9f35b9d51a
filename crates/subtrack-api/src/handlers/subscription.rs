//! Subscription tracking handlers.
//!
//! The CRUD layer reports subscriptions here so the engine can emit
//! lifecycle notifications and keep reminder workflows in step.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::Utc;

use subtrack_core::error::AppError;
use subtrack_core::types::id::SubscriptionId;
use subtrack_entity::subscription::Subscription;

use crate::dto::request::{TrackSubscriptionRequest, UpdateSubscriptionRequest};
use crate::dto::response::{ApiResponse, SubscriptionEventResponse};
use crate::error::ApiError;
use crate::extractors::{ApiPath, AuthUser, ValidatedJson};
use crate::handlers::access::owned_subscription;
use crate::state::AppState;

/// POST /api/subscriptions
pub async fn track(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<TrackSubscriptionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SubscriptionEventResponse>>), ApiError> {
    let now = Utc::now();
    let subscription = req.into_draft(auth.user_id).into_subscription(now)?;
    let subscription = state.storage.subscriptions.insert(subscription).await?;
    tracing::info!(
        subscription_id = %subscription.id,
        user_id = %subscription.user_id,
        "Subscription tracked"
    );

    let generated = state
        .reminder_coordinator
        .on_subscription_added(&subscription, now)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(SubscriptionEventResponse {
            subscription,
            notifications: vec![generated],
        })),
    ))
}

/// PUT /api/subscriptions/{id}
pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<SubscriptionId>,
    ValidatedJson(req): ValidatedJson<UpdateSubscriptionRequest>,
) -> Result<Json<ApiResponse<SubscriptionEventResponse>>, ApiError> {
    let now = Utc::now();
    let before = owned_subscription(&state, &auth, id).await?;
    if req.renewal_date <= before.start_date {
        return Err(AppError::validation("Renewal date must be after the start date").into());
    }

    let after = Subscription {
        name: req.name,
        price: req.price,
        currency: req.currency,
        frequency: req.frequency,
        renewal_date: req.renewal_date,
        trial_end_date: req.trial_end_date,
        status: req.status,
        updated_at: now,
        ..before.clone()
    };
    let after = state
        .storage
        .subscriptions
        .update(after)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Subscription {id} not found")))?;

    let notifications = state
        .reminder_coordinator
        .on_subscription_updated(&before, &after, now)
        .await?;

    Ok(Json(ApiResponse::ok(SubscriptionEventResponse {
        subscription: after,
        notifications,
    })))
}
