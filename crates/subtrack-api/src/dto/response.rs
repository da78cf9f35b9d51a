//! Response DTOs.

use serde::{Deserialize, Serialize};

use subtrack_entity::notification::Generated;
use subtrack_entity::subscription::Subscription;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Count response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: u64,
}

/// Rows touched by a bulk operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffectedResponse {
    pub affected: u64,
}

/// Simple message response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A subscription and the notifications its change produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionEventResponse {
    pub subscription: Subscription,
    pub notifications: Vec<Generated>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `"ok"` or `"degraded"`.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Storage backend in use.
    pub storage: String,
}
