//! Health check handler.

use axum::Json;
use axum::extract::State;

use subtrack_core::config::StorageProvider;
use subtrack_core::types::id::SubscriptionId;

use crate::dto::response::{ApiResponse, HealthResponse};
use crate::state::AppState;

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    let storage = match state.config.database.provider {
        StorageProvider::Postgres => "postgres",
        StorageProvider::Memory => "memory",
    };

    // Point lookup of an id that cannot exist.
    let probe = SubscriptionId::from_uuid(uuid::Uuid::nil());
    let status = match state.storage.subscriptions.find_by_id(probe).await {
        Ok(_) => "ok",
        Err(e) => {
            tracing::warn!(error = %e, "Health check storage probe failed");
            "degraded"
        }
    };

    Json(ApiResponse::ok(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage: storage.to_string(),
    }))
}
