//! # subtrack-database
//!
//! Storage for SubTrack: the store traits the services are written
//! against, PostgreSQL repositories implementing them, and an in-memory
//! backend with the same atomicity guarantees for development and tests.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use store::{
    GroupStore, JobStore, NotificationStore, PaymentStore, Storage, SubscriptionStore,
    WorkflowStore,
};
