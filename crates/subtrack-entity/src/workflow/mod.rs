//! Reminder workflow state per subscription.

pub mod model;

pub use model::ReminderWorkflow;
