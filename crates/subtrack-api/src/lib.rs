//! # subtrack-api
//!
//! HTTP API layer for SubTrack built on Axum.
//!
//! Provides the REST endpoints for notifications, reminder workflows,
//! payment tracking, sharing groups and provider webhooks, along with
//! request logging, CORS, extractors, DTOs and error mapping.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::build_app;
pub use error::ApiError;
pub use state::AppState;
