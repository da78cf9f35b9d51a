//! Payment-provider webhook handler.
//!
//! Signature verification happens at the gateway; events arriving here
//! are trusted.

use axum::Json;
use axum::extract::State;
use chrono::Utc;

use subtrack_service::webhook::{PaymentWebhookEvent, WebhookOutcome};

use crate::dto::response::ApiResponse;
use crate::error::ApiError;
use crate::extractors::ApiJson;
use crate::state::AppState;

/// POST /api/webhooks/payments
pub async fn payments(
    State(state): State<AppState>,
    ApiJson(event): ApiJson<PaymentWebhookEvent>,
) -> Result<Json<ApiResponse<WebhookOutcome>>, ApiError> {
    tracing::info!(
        subscription_id = %event.subscription_id(),
        "Payment webhook received"
    );
    let outcome = state.webhook_service.handle(event, Utc::now()).await?;
    Ok(Json(ApiResponse::ok(outcome)))
}
