//! Background job processing and scheduled tasks for SubTrack.
//!
//! This crate provides:
//! - A job queue over the storage backend's job table
//! - A worker runner that polls for and executes queued jobs
//! - The job-queue-backed reminder scheduler (delayed callback jobs)
//! - A cron scheduler enqueuing the periodic sweeps
//! - Job handlers for reminder callbacks, sweeps and cleanup

pub mod callback;
pub mod executor;
pub mod jobs;
pub mod queue;
pub mod runner;
pub mod scheduler;

pub use callback::JobQueueScheduler;
pub use executor::{JobExecutionError, JobExecutor, JobHandler};
pub use jobs::default_executor;
pub use queue::JobQueue;
pub use runner::WorkerRunner;
pub use scheduler::CronScheduler;
