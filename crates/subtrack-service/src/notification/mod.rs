//! Notification generation and user-facing notification management.

pub mod generator;
pub mod policy;
pub mod service;
pub mod templates;

pub use generator::NotificationGenerator;
pub use service::NotificationService;
