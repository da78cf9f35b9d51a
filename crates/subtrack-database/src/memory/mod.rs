//! In-memory store implementations.
//!
//! Used when `database.provider = "memory"` and by tests. Each store
//! keeps the same atomicity guarantees as its PostgreSQL counterpart:
//! conditional updates happen under a single shard or mutex guard.

pub mod group;
pub mod job;
pub mod notification;
pub mod payment;
pub mod subscription;
pub mod workflow;

pub use group::MemoryGroupStore;
pub use job::MemoryJobStore;
pub use notification::MemoryNotificationStore;
pub use payment::MemoryPaymentStore;
pub use subscription::MemorySubscriptionStore;
pub use workflow::MemoryWorkflowStore;
