//! Store traits shared by the PostgreSQL and in-memory backends.
//!
//! Every method that mutates state is a single conditional operation:
//! callers never read-then-write across two calls to enforce an invariant.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use subtrack_core::result::AppResult;
use subtrack_core::types::id::{
    GroupId, JobId, NotificationId, PaymentId, SubscriptionId, UserId,
};
use subtrack_core::types::pagination::{PageRequest, PageResponse};
use subtrack_entity::group::{GroupMember, SharingGroup, SplitConfig};
use subtrack_entity::job::{CreateJob, Job};
use subtrack_entity::notification::{Generated, NewNotification, Notification, NotificationFilter};
use subtrack_entity::payment::{Payment, PaymentStatus};
use subtrack_entity::subscription::{Subscription, SubscriptionStatus};
use subtrack_entity::workflow::ReminderWorkflow;

use crate::memory;
use crate::repositories;

/// Notification persistence.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Atomically return the newest notification with the same dedup key
    /// created after `window_start`, or insert `new` if there is none.
    async fn find_or_insert(
        &self,
        new: NewNotification,
        window_start: DateTime<Utc>,
    ) -> AppResult<Generated>;

    async fn find_by_id(&self, id: NotificationId) -> AppResult<Option<Notification>>;

    /// Newest first.
    async fn list(
        &self,
        user_id: UserId,
        filter: NotificationFilter,
        page: PageRequest,
    ) -> AppResult<PageResponse<Notification>>;

    async fn count_unread(&self, user_id: UserId) -> AppResult<u64>;

    /// Set the read flag on one of the user's notifications. `None` if it does not exist.
    async fn set_read(
        &self,
        user_id: UserId,
        id: NotificationId,
        read: bool,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Notification>>;

    async fn mark_all_read(&self, user_id: UserId, now: DateTime<Utc>) -> AppResult<u64>;

    async fn mark_read_bulk(
        &self,
        user_id: UserId,
        ids: &[NotificationId],
        now: DateTime<Utc>,
    ) -> AppResult<u64>;

    async fn delete(&self, user_id: UserId, id: NotificationId) -> AppResult<bool>;

    async fn delete_all(&self, user_id: UserId) -> AppResult<u64>;

    async fn delete_read(&self, user_id: UserId) -> AppResult<u64>;

    async fn delete_bulk(&self, user_id: UserId, ids: &[NotificationId]) -> AppResult<u64>;

    /// Retention sweep: delete read notifications created before `cutoff`.
    async fn delete_read_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64>;
}

/// Subscription reads plus the engine's few conditional writes.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn find_by_id(&self, id: SubscriptionId) -> AppResult<Option<Subscription>>;

    /// All subscriptions in `trial` or `active` status.
    async fn list_remindable(&self) -> AppResult<Vec<Subscription>>;

    async fn insert(&self, subscription: Subscription) -> AppResult<Subscription>;

    /// Replace a stored subscription. `None` if it does not exist.
    async fn update(&self, subscription: Subscription) -> AppResult<Option<Subscription>>;

    /// Change status only if it is currently `from`. `None` when the guard fails.
    async fn transition_status(
        &self,
        id: SubscriptionId,
        from: SubscriptionStatus,
        to: SubscriptionStatus,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Subscription>>;
}

/// Shared-cost payment persistence.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn insert(&self, payment: Payment) -> AppResult<Payment>;

    /// Insert a batch atomically.
    async fn insert_many(&self, payments: Vec<Payment>) -> AppResult<Vec<Payment>>;

    async fn find_by_id(&self, id: PaymentId) -> AppResult<Option<Payment>>;

    /// pending|overdue → paid. `None` when the payment is missing or terminal.
    async fn mark_paid(
        &self,
        id: PaymentId,
        method: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Payment>>;

    /// `expected` → `next`. `None` when the current status is not `expected`.
    async fn set_status(
        &self,
        id: PaymentId,
        expected: PaymentStatus,
        next: PaymentStatus,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Payment>>;

    /// Bump the reminder counter of a non-terminal payment.
    async fn record_reminder(&self, id: PaymentId, now: DateTime<Utc>) -> AppResult<Option<Payment>>;

    /// Bulk pending ∧ due_date < now → overdue. Returns the rows that changed.
    async fn mark_overdue(&self, now: DateTime<Utc>) -> AppResult<Vec<Payment>>;

    /// Payments of a group with `start <= due_date <= end`, by due date.
    async fn list_for_group(
        &self,
        group_id: GroupId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<Payment>>;
}

/// Sharing group persistence.
#[async_trait]
pub trait GroupStore: Send + Sync {
    async fn find_by_id(&self, id: GroupId) -> AppResult<Option<SharingGroup>>;

    async fn insert(&self, group: SharingGroup) -> AppResult<SharingGroup>;

    /// Add a member. Conflict if the user is already listed.
    async fn add_member(&self, group_id: GroupId, member: GroupMember) -> AppResult<()>;

    /// Flip a member's active flag. `false` if the user is not listed.
    async fn set_member_active(
        &self,
        group_id: GroupId,
        user_id: UserId,
        active: bool,
    ) -> AppResult<bool>;

    /// Share a subscription in the group or replace its split.
    async fn upsert_split(
        &self,
        group_id: GroupId,
        subscription_id: SubscriptionId,
        split: SplitConfig,
    ) -> AppResult<()>;
}

/// Reminder workflow records.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    async fn get(&self, subscription_id: SubscriptionId) -> AppResult<Option<ReminderWorkflow>>;

    /// Store `next` if the stored version still equals `expected_version`
    /// (0 = no record yet). Returns the stored record with the bumped
    /// version; Conflict when the version moved.
    async fn compare_and_set(
        &self,
        next: ReminderWorkflow,
        expected_version: i64,
    ) -> AppResult<ReminderWorkflow>;
}

/// Background job queue persistence.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create(&self, job: CreateJob) -> AppResult<Job>;

    async fn find_by_id(&self, id: JobId) -> AppResult<Option<Job>>;

    /// Claim the next due pending job of a queue (highest priority, oldest first).
    async fn claim_next(
        &self,
        queue: &str,
        worker_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Job>>;

    async fn mark_completed(&self, id: JobId, result: Option<serde_json::Value>) -> AppResult<()>;

    async fn mark_failed(&self, id: JobId, error: &str) -> AppResult<()>;

    /// Put a running job back to pending, not before `run_at`.
    async fn retry(&self, id: JobId, run_at: DateTime<Utc>) -> AppResult<()>;

    /// Cancel a pending job. `false` if it already ran or does not exist.
    async fn cancel(&self, id: JobId) -> AppResult<bool>;

    /// Delete finished jobs last updated before `before`.
    async fn cleanup_finished(&self, before: DateTime<Utc>) -> AppResult<u64>;
}

/// The full set of stores the services run against.
#[derive(Clone)]
pub struct Storage {
    pub notifications: Arc<dyn NotificationStore>,
    pub subscriptions: Arc<dyn SubscriptionStore>,
    pub payments: Arc<dyn PaymentStore>,
    pub groups: Arc<dyn GroupStore>,
    pub workflows: Arc<dyn WorkflowStore>,
    pub jobs: Arc<dyn JobStore>,
}

impl Storage {
    /// PostgreSQL-backed stores sharing one pool.
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            notifications: Arc::new(repositories::NotificationRepository::new(pool.clone())),
            subscriptions: Arc::new(repositories::SubscriptionRepository::new(pool.clone())),
            payments: Arc::new(repositories::PaymentRepository::new(pool.clone())),
            groups: Arc::new(repositories::GroupRepository::new(pool.clone())),
            workflows: Arc::new(repositories::WorkflowRepository::new(pool.clone())),
            jobs: Arc::new(repositories::JobRepository::new(pool)),
        }
    }

    /// Process-local stores.
    pub fn in_memory() -> Self {
        Self {
            notifications: Arc::new(memory::MemoryNotificationStore::new()),
            subscriptions: Arc::new(memory::MemorySubscriptionStore::new()),
            payments: Arc::new(memory::MemoryPaymentStore::new()),
            groups: Arc::new(memory::MemoryGroupStore::new()),
            workflows: Arc::new(memory::MemoryWorkflowStore::new()),
            jobs: Arc::new(memory::MemoryJobStore::new()),
        }
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage").finish_non_exhaustive()
    }
}
