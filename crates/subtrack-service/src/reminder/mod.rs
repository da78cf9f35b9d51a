//! Renewal and trial reminder workflows.

pub mod coordinator;
pub mod retry;
pub mod schedule;

pub use coordinator::{Evaluation, FireOutcome, ReminderCoordinator, SweepReport, WorkflowStatus};
pub use retry::RetryPolicy;
