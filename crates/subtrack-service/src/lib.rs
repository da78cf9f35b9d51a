//! # subtrack-service
//!
//! Business logic for the SubTrack obligation engine: notification
//! generation with deduplication, the reminder workflow coordinator,
//! cost-split computation and shared payment tracking.
//!
//! Services follow constructor injection: all dependencies are provided
//! at construction time via `Arc` references to store traits and the
//! external scheduler.

pub mod context;
pub mod group;
pub mod notification;
pub mod payment;
pub mod reminder;
pub mod split;
pub mod webhook;

#[cfg(test)]
pub(crate) mod testing;

pub use context::RequestContext;
pub use group::GroupService;
pub use notification::{NotificationGenerator, NotificationService};
pub use payment::PaymentTracker;
pub use reminder::{ReminderCoordinator, RetryPolicy};
pub use split::SplitCalculator;
pub use webhook::WebhookService;
