//! Built-in job handler implementations.

pub mod maintenance;
pub mod notification;
pub mod payment;
pub mod reminder;

use std::sync::Arc;

use subtrack_service::{NotificationGenerator, PaymentTracker, ReminderCoordinator};

pub use maintenance::JobCleanupHandler;
pub use notification::NotificationCleanupHandler;
pub use payment::OverdueSweepHandler;
pub use reminder::{ReminderCallbackHandler, ReminderSweepHandler};

use crate::executor::JobExecutor;
use crate::queue::JobQueue;

/// Executor with a handler for every job type the engine enqueues.
pub fn default_executor(
    coordinator: Arc<ReminderCoordinator>,
    tracker: Arc<PaymentTracker>,
    generator: Arc<NotificationGenerator>,
    queue: Arc<JobQueue>,
    job_retention_days: i64,
) -> JobExecutor {
    let mut executor = JobExecutor::new();
    executor.register(Arc::new(ReminderCallbackHandler::new(Arc::clone(&coordinator))));
    executor.register(Arc::new(ReminderSweepHandler::new(coordinator)));
    executor.register(Arc::new(OverdueSweepHandler::new(tracker)));
    executor.register(Arc::new(NotificationCleanupHandler::new(generator)));
    executor.register(Arc::new(JobCleanupHandler::new(queue, job_retention_days)));
    executor
}
