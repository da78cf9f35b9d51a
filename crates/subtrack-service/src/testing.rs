//! Fixtures shared by the service tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio::sync::Mutex;

use subtrack_core::config::notification::NotificationConfig;
use subtrack_core::error::AppError;
use subtrack_core::result::AppResult;
use subtrack_core::traits::scheduler::{ReminderScheduler, ScheduledCallbackStatus};
use subtrack_core::types::id::{NotificationId, SubscriptionId, UserId, WorkflowHandle};
use subtrack_core::types::pagination::{PageRequest, PageResponse};
use subtrack_database::{NotificationStore, Storage};
use subtrack_entity::group::{GroupMember, GroupRole, SharedSubscription, SharingGroup, SplitConfig};
use subtrack_entity::notification::{Generated, NewNotification, Notification, NotificationFilter};
use subtrack_entity::subscription::{BillingFrequency, Subscription, SubscriptionStatus};

use crate::notification::NotificationGenerator;

/// A fixed instant in the middle of a day.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
}

pub fn generator(storage: &Storage) -> Arc<NotificationGenerator> {
    Arc::new(NotificationGenerator::new(
        storage.notifications.clone(),
        NotificationConfig::default(),
    ))
}

/// A monthly 9.99 USD subscription renewing `renews_in` after `now`.
pub fn subscription(
    user_id: UserId,
    status: SubscriptionStatus,
    renews_in: Duration,
    now: DateTime<Utc>,
) -> Subscription {
    Subscription {
        id: SubscriptionId::new(),
        user_id,
        name: "Netflix".to_string(),
        price: 9.99,
        currency: "USD".to_string(),
        frequency: BillingFrequency::Monthly,
        start_date: now - Duration::days(60),
        renewal_date: now + renews_in,
        trial_end_date: None,
        status,
        created_at: now - Duration::days(60),
        updated_at: now - Duration::days(60),
    }
}

/// A group with `size` active members (owner first) sharing `subscription_id` equally.
pub fn group(size: usize, subscription_id: SubscriptionId) -> (SharingGroup, Vec<UserId>) {
    let owner = UserId::new();
    let mut group = SharingGroup::new(owner, "Household", now() - Duration::days(90));
    let mut users = vec![owner];
    for _ in 1..size {
        let user_id = UserId::new();
        group.members.push(GroupMember {
            user_id,
            role: GroupRole::Member,
            joined_at: now() - Duration::days(30),
            active: true,
        });
        users.push(user_id);
    }
    group.subscriptions.push(SharedSubscription {
        subscription_id,
        split: SplitConfig::Equal,
    });
    (group, users)
}

/// One call recorded by [`FakeScheduler`].
#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerCall {
    Schedule(SubscriptionId, DateTime<Utc>, WorkflowHandle),
    Cancel(WorkflowHandle),
}

/// Records calls and hands out sequential handles. Fails the next
/// `failures` calls with an external-service error.
#[derive(Debug, Default)]
pub struct FakeScheduler {
    pub calls: Mutex<Vec<SchedulerCall>>,
    failures: AtomicU32,
    counter: AtomicU32,
}

impl FakeScheduler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_next(&self, n: u32) {
        self.failures.store(n, Ordering::SeqCst);
    }

    pub async fn scheduled(&self) -> Vec<(SubscriptionId, DateTime<Utc>, WorkflowHandle)> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|c| match c {
                SchedulerCall::Schedule(s, at, h) => Some((*s, *at, h.clone())),
                SchedulerCall::Cancel(_) => None,
            })
            .collect()
    }

    pub async fn cancelled(&self) -> Vec<WorkflowHandle> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|c| match c {
                SchedulerCall::Cancel(h) => Some(h.clone()),
                SchedulerCall::Schedule(..) => None,
            })
            .collect()
    }

    fn check(&self) -> AppResult<()> {
        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            Err(AppError::external("scheduler unavailable"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ReminderScheduler for FakeScheduler {
    async fn schedule(
        &self,
        subscription_id: SubscriptionId,
        fire_at: DateTime<Utc>,
    ) -> AppResult<WorkflowHandle> {
        self.check()?;
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let handle = WorkflowHandle::new(format!("cb-{n}"));
        self.calls.lock().await.push(SchedulerCall::Schedule(
            subscription_id,
            fire_at,
            handle.clone(),
        ));
        Ok(handle)
    }

    async fn cancel(&self, handle: &WorkflowHandle) -> AppResult<()> {
        self.check()?;
        self.calls
            .lock()
            .await
            .push(SchedulerCall::Cancel(handle.clone()));
        Ok(())
    }

    async fn status(&self, handle: &WorkflowHandle) -> AppResult<ScheduledCallbackStatus> {
        self.check()?;
        let calls = self.calls.lock().await;
        if calls.contains(&SchedulerCall::Cancel(handle.clone())) {
            Ok(ScheduledCallbackStatus::Cancelled)
        } else if calls
            .iter()
            .any(|c| matches!(c, SchedulerCall::Schedule(_, _, h) if h == handle))
        {
            Ok(ScheduledCallbackStatus::Pending)
        } else {
            Ok(ScheduledCallbackStatus::Unknown)
        }
    }
}

/// Wraps a notification store; inserts fail while `failing` is set.
pub struct FlakyNotifications {
    inner: Arc<dyn NotificationStore>,
    failing: AtomicBool,
}

impl FlakyNotifications {
    pub fn new(inner: Arc<dyn NotificationStore>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            failing: AtomicBool::new(false),
        })
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl NotificationStore for FlakyNotifications {
    async fn find_or_insert(
        &self,
        new: NewNotification,
        window_start: DateTime<Utc>,
    ) -> AppResult<Generated> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::database("notification insert failed"));
        }
        self.inner.find_or_insert(new, window_start).await
    }

    async fn find_by_id(&self, id: NotificationId) -> AppResult<Option<Notification>> {
        self.inner.find_by_id(id).await
    }

    async fn list(
        &self,
        user_id: UserId,
        filter: NotificationFilter,
        page: PageRequest,
    ) -> AppResult<PageResponse<Notification>> {
        self.inner.list(user_id, filter, page).await
    }

    async fn count_unread(&self, user_id: UserId) -> AppResult<u64> {
        self.inner.count_unread(user_id).await
    }

    async fn set_read(
        &self,
        user_id: UserId,
        id: NotificationId,
        read: bool,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Notification>> {
        self.inner.set_read(user_id, id, read, now).await
    }

    async fn mark_all_read(&self, user_id: UserId, now: DateTime<Utc>) -> AppResult<u64> {
        self.inner.mark_all_read(user_id, now).await
    }

    async fn mark_read_bulk(
        &self,
        user_id: UserId,
        ids: &[NotificationId],
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        self.inner.mark_read_bulk(user_id, ids, now).await
    }

    async fn delete(&self, user_id: UserId, id: NotificationId) -> AppResult<bool> {
        self.inner.delete(user_id, id).await
    }

    async fn delete_all(&self, user_id: UserId) -> AppResult<u64> {
        self.inner.delete_all(user_id).await
    }

    async fn delete_read(&self, user_id: UserId) -> AppResult<u64> {
        self.inner.delete_read(user_id).await
    }

    async fn delete_bulk(&self, user_id: UserId, ids: &[NotificationId]) -> AppResult<u64> {
        self.inner.delete_bulk(user_id, ids).await
    }

    async fn delete_read_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        self.inner.delete_read_before(cutoff).await
    }
}
