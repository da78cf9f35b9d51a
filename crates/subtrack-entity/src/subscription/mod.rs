//! Subscription domain entities.

pub mod frequency;
pub mod model;
pub mod status;

pub use frequency::BillingFrequency;
pub use model::{Subscription, SubscriptionDraft};
pub use status::SubscriptionStatus;
