//! Shared-cost payment obligations.

pub mod tracker;

pub use tracker::{AllocatePeriod, PaymentTracker};
