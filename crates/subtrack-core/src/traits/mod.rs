//! Core traits defined in `subtrack-core` and implemented by other crates.

pub mod scheduler;

pub use scheduler::{ReminderScheduler, ScheduledCallbackStatus};
