//! Reminder workflow coordinator.
//!
//! Owns the decision of which reminders are due for a subscription and the
//! lifecycle of the external callback that brings the subscription back
//! for its next evaluation. Notifications are persisted before the
//! scheduler is called; scheduler failures never undo local state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use subtrack_core::config::reminder::ReminderConfig;
use subtrack_core::error::{AppError, ErrorKind};
use subtrack_core::result::AppResult;
use subtrack_core::traits::scheduler::{ReminderScheduler, ScheduledCallbackStatus};
use subtrack_core::types::id::{SubscriptionId, WorkflowHandle};
use subtrack_database::{SubscriptionStore, WorkflowStore};
use subtrack_entity::notification::{EventFacts, Generated};
use subtrack_entity::subscription::{Subscription, SubscriptionStatus};
use subtrack_entity::workflow::ReminderWorkflow;

use super::retry::RetryPolicy;
use super::schedule::{due_offset, next_fire_at};
use crate::notification::NotificationGenerator;

/// Result of evaluating one subscription.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Evaluation {
    /// The subscription was moved to `expired` by this evaluation.
    pub expired: bool,
    /// Notifications produced (new or deduplicated).
    pub notifications: Vec<Generated>,
}

impl Evaluation {
    pub fn created_count(&self) -> usize {
        self.notifications.iter().filter(|g| g.is_created()).count()
    }
}

/// What a delivered callback led to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FireOutcome {
    Evaluated(Evaluation),
    /// The handle no longer matches the stored one.
    Stale,
    /// The subscription no longer receives reminders.
    Inactive,
    /// The subscription no longer exists.
    Missing,
}

/// Workflow state as reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStatus {
    pub subscription_id: SubscriptionId,
    pub has_handle: bool,
    pub handle: Option<WorkflowHandle>,
    pub scheduler_status: Option<ScheduledCallbackStatus>,
    pub next_fire_at: Option<DateTime<Utc>>,
    pub last_evaluated_at: Option<DateTime<Utc>>,
}

/// Counters of a full reminder sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub evaluated: u64,
    pub expired: u64,
    pub notifications_created: u64,
    pub rescheduled: u64,
    pub failed: u64,
}

/// Coordinates reminder evaluation and the scheduled callback per subscription.
#[derive(Clone)]
pub struct ReminderCoordinator {
    subscriptions: Arc<dyn SubscriptionStore>,
    workflows: Arc<dyn WorkflowStore>,
    scheduler: Arc<dyn ReminderScheduler>,
    generator: Arc<NotificationGenerator>,
    config: ReminderConfig,
    retry: RetryPolicy,
}

impl std::fmt::Debug for ReminderCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReminderCoordinator")
            .field("config", &self.config)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl ReminderCoordinator {
    /// Creates a new coordinator.
    pub fn new(
        subscriptions: Arc<dyn SubscriptionStore>,
        workflows: Arc<dyn WorkflowStore>,
        scheduler: Arc<dyn ReminderScheduler>,
        generator: Arc<NotificationGenerator>,
        config: ReminderConfig,
    ) -> Self {
        let retry = RetryPolicy::from_config(&config);
        Self {
            subscriptions,
            workflows,
            scheduler,
            generator,
            config,
            retry,
        }
    }

    /// Replace the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Expire a lapsed subscription, otherwise fire whichever renewal and
    /// trial reminders are due now.
    pub async fn evaluate(
        &self,
        subscription: &Subscription,
        now: DateTime<Utc>,
    ) -> AppResult<Evaluation> {
        let mut evaluation = Evaluation::default();
        if !subscription.status.receives_reminders() {
            return Ok(evaluation);
        }

        if subscription.is_lapsed(now) {
            let expired = self
                .subscriptions
                .transition_status(
                    subscription.id,
                    subscription.status,
                    SubscriptionStatus::Expired,
                    now,
                )
                .await?;
            if let Some(expired) = expired {
                info!(subscription_id = %subscription.id, "Subscription expired");
                let facts = EventFacts::StatusChange {
                    subscription_name: expired.name.clone(),
                    old_status: subscription.status,
                    new_status: SubscriptionStatus::Expired,
                };
                evaluation.expired = true;
                evaluation.notifications.push(
                    self.generator
                        .generate(expired.user_id, Some(expired.id), &facts, now)
                        .await?,
                );
            }
            return Ok(evaluation);
        }

        if let Some(days) = due_offset(
            &self.config.renewal_offsets_days,
            subscription.renewal_date,
            now,
        ) {
            let facts = EventFacts::Renewal {
                subscription_name: subscription.name.clone(),
                price: subscription.price,
                currency: subscription.currency.clone(),
                renewal_date: subscription.renewal_date,
                days_until_renewal: days,
            };
            evaluation.notifications.push(
                self.generator
                    .generate(subscription.user_id, Some(subscription.id), &facts, now)
                    .await?,
            );
        }

        if subscription.status == SubscriptionStatus::Trial {
            if let Some(trial_end) = subscription.trial_end_date {
                if let Some(days) = due_offset(&self.config.trial_offsets_days, trial_end, now) {
                    let facts = EventFacts::TrialEnding {
                        subscription_name: subscription.name.clone(),
                        price: subscription.price,
                        currency: subscription.currency.clone(),
                        trial_end_date: trial_end,
                        days_remaining: days,
                    };
                    evaluation.notifications.push(
                        self.generator
                            .generate(subscription.user_id, Some(subscription.id), &facts, now)
                            .await?,
                    );
                }
            }
        }

        debug!(
            subscription_id = %subscription.id,
            notifications = evaluation.notifications.len(),
            "Subscription evaluated"
        );
        Ok(evaluation)
    }

    /// Replace the subscription's callback with one at its next fire time.
    pub async fn schedule_workflow(
        &self,
        subscription: &Subscription,
        now: DateTime<Utc>,
    ) -> AppResult<ReminderWorkflow> {
        self.reschedule(subscription, None, now).await
    }

    /// Re-evaluate a subscription now and schedule its next callback.
    pub async fn retrigger(
        &self,
        subscription_id: SubscriptionId,
        now: DateTime<Utc>,
    ) -> AppResult<WorkflowStatus> {
        let subscription = self.load(subscription_id).await?;
        self.evaluate(&subscription, now).await?;
        let subscription = self.load(subscription_id).await?;
        self.reschedule(&subscription, Some(now), now).await?;
        info!(subscription_id = %subscription_id, "Workflow retriggered");
        self.status(subscription_id).await
    }

    /// Cancel the subscription's callback and clear it. No handle is a no-op.
    pub async fn cancel(&self, subscription_id: SubscriptionId, now: DateTime<Utc>) -> AppResult<()> {
        let Some(current) = self.workflows.get(subscription_id).await? else {
            return Ok(());
        };
        let Some(handle) = current.handle.clone() else {
            return Ok(());
        };

        self.cancel_remote(&handle).await;

        let cleared = ReminderWorkflow {
            handle: None,
            next_fire_at: None,
            updated_at: now,
            ..current.clone()
        };
        self.workflows
            .compare_and_set(cleared, current.version)
            .await?;
        info!(subscription_id = %subscription_id, handle = %handle, "Workflow cancelled");
        Ok(())
    }

    /// Handle presence, the scheduler's view, and evaluation times.
    pub async fn status(&self, subscription_id: SubscriptionId) -> AppResult<WorkflowStatus> {
        self.load(subscription_id).await?;
        let workflow = self.workflows.get(subscription_id).await?;
        let Some(workflow) = workflow else {
            return Ok(WorkflowStatus {
                subscription_id,
                has_handle: false,
                handle: None,
                scheduler_status: None,
                next_fire_at: None,
                last_evaluated_at: None,
            });
        };

        let scheduler_status = match &workflow.handle {
            Some(handle) => Some(match self.scheduler.status(handle).await {
                Ok(status) => status,
                Err(e) => {
                    warn!(
                        subscription_id = %subscription_id,
                        handle = %handle,
                        error = %e,
                        "Scheduler status lookup failed"
                    );
                    ScheduledCallbackStatus::Unknown
                }
            }),
            None => None,
        };

        Ok(WorkflowStatus {
            subscription_id,
            has_handle: workflow.handle.is_some(),
            handle: workflow.handle,
            scheduler_status,
            next_fire_at: workflow.next_fire_at,
            last_evaluated_at: workflow.last_evaluated_at,
        })
    }

    /// A subscription started being tracked.
    pub async fn on_subscription_added(
        &self,
        subscription: &Subscription,
        now: DateTime<Utc>,
    ) -> AppResult<Generated> {
        let facts = EventFacts::SubscriptionAdded {
            subscription_name: subscription.name.clone(),
            price: subscription.price,
            currency: subscription.currency.clone(),
            frequency: subscription.frequency,
            renewal_date: subscription.renewal_date,
        };
        let generated = self
            .generator
            .generate(subscription.user_id, Some(subscription.id), &facts, now)
            .await?;

        if subscription.status.receives_reminders() {
            self.reschedule_logged(subscription, now).await;
        }
        Ok(generated)
    }

    /// A subscription's status changed from `old_status`.
    pub async fn on_status_changed(
        &self,
        subscription: &Subscription,
        old_status: SubscriptionStatus,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Generated>> {
        if old_status == subscription.status {
            return Ok(None);
        }
        let facts = EventFacts::StatusChange {
            subscription_name: subscription.name.clone(),
            old_status,
            new_status: subscription.status,
        };
        let generated = self
            .generator
            .generate(subscription.user_id, Some(subscription.id), &facts, now)
            .await?;

        if subscription.status.receives_reminders() {
            self.reschedule_logged(subscription, now).await;
        } else if let Err(e) = self.cancel(subscription.id, now).await {
            warn!(
                subscription_id = %subscription.id,
                error = %e,
                "Failed to clear workflow after status change"
            );
        }
        Ok(Some(generated))
    }

    /// A subscription's price changed from `old_price`.
    pub async fn on_price_changed(
        &self,
        subscription: &Subscription,
        old_price: f64,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Generated>> {
        if old_price == subscription.price {
            return Ok(None);
        }
        let facts = EventFacts::PriceChange {
            subscription_name: subscription.name.clone(),
            currency: subscription.currency.clone(),
            old_price,
            new_price: subscription.price,
        };
        let generated = self
            .generator
            .generate(subscription.user_id, Some(subscription.id), &facts, now)
            .await?;
        Ok(Some(generated))
    }

    /// Diff two versions of a subscription and dispatch the matching events.
    pub async fn on_subscription_updated(
        &self,
        before: &Subscription,
        after: &Subscription,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Generated>> {
        let mut generated = Vec::new();

        if let Some(g) = self.on_price_changed(after, before.price, now).await? {
            generated.push(g);
        }

        if before.status != after.status {
            if let Some(g) = self.on_status_changed(after, before.status, now).await? {
                generated.push(g);
            }
        } else if after.status.receives_reminders()
            && (before.renewal_date != after.renewal_date
                || before.trial_end_date != after.trial_end_date)
        {
            self.reschedule_logged(after, now).await;
        }

        Ok(generated)
    }

    /// Entry point for a delivered callback.
    pub async fn fire(
        &self,
        subscription_id: SubscriptionId,
        handle: &WorkflowHandle,
        now: DateTime<Utc>,
    ) -> AppResult<FireOutcome> {
        let stored = self.workflows.get(subscription_id).await?;
        if stored.as_ref().and_then(|w| w.handle.as_ref()) != Some(handle) {
            debug!(subscription_id = %subscription_id, handle = %handle, "Dropping stale callback");
            return Ok(FireOutcome::Stale);
        }

        let Some(subscription) = self.subscriptions.find_by_id(subscription_id).await? else {
            return Ok(FireOutcome::Missing);
        };
        if !subscription.status.receives_reminders() {
            return Ok(FireOutcome::Inactive);
        }

        let evaluation = self.evaluate(&subscription, now).await?;
        let subscription = self.load(subscription_id).await?;
        self.reschedule(&subscription, Some(now), now).await?;
        Ok(FireOutcome::Evaluated(evaluation))
    }

    /// Evaluate every active and trial subscription. Subscriptions without a
    /// live callback get a new one. Failures are logged per subscription.
    pub async fn sweep(&self, now: DateTime<Utc>) -> AppResult<SweepReport> {
        let mut report = SweepReport::default();

        for subscription in self.subscriptions.list_remindable().await? {
            match self.sweep_one(&subscription, now, &mut report).await {
                Ok(()) => report.evaluated += 1,
                Err(e) => {
                    report.failed += 1;
                    error!(
                        subscription_id = %subscription.id,
                        error = %e,
                        "Reminder sweep failed for subscription"
                    );
                }
            }
        }

        info!(
            evaluated = report.evaluated,
            expired = report.expired,
            notifications_created = report.notifications_created,
            rescheduled = report.rescheduled,
            failed = report.failed,
            "Reminder sweep finished"
        );
        Ok(report)
    }

    async fn sweep_one(
        &self,
        subscription: &Subscription,
        now: DateTime<Utc>,
        report: &mut SweepReport,
    ) -> AppResult<()> {
        let evaluation = self.evaluate(subscription, now).await?;
        report.notifications_created += evaluation.created_count() as u64;

        if evaluation.expired {
            report.expired += 1;
            return self.cancel(subscription.id, now).await;
        }

        let workflow = self.workflows.get(subscription.id).await?;
        let needs_callback = match &workflow {
            Some(w) => w.handle.is_none() || w.next_fire_at.is_none_or(|at| at <= now),
            None => true,
        };
        if needs_callback {
            self.reschedule(subscription, Some(now), now).await?;
            report.rescheduled += 1;
        }
        Ok(())
    }

    async fn load(&self, subscription_id: SubscriptionId) -> AppResult<Subscription> {
        self.subscriptions
            .find_by_id(subscription_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Subscription {subscription_id} not found")))
    }

    async fn reschedule_logged(&self, subscription: &Subscription, now: DateTime<Utc>) {
        if let Err(e) = self.reschedule(subscription, None, now).await {
            warn!(
                subscription_id = %subscription.id,
                error = %e,
                "Failed to schedule reminder workflow"
            );
        }
    }

    /// Cancel the stored callback, request the next one and store it under
    /// the version that was read.
    async fn reschedule(
        &self,
        subscription: &Subscription,
        evaluated_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> AppResult<ReminderWorkflow> {
        let current = self
            .workflows
            .get(subscription.id)
            .await?
            .unwrap_or_else(|| ReminderWorkflow::empty(subscription.id, now));
        let fire_at = next_fire_at(subscription, &self.config, now);

        if let Some(old) = &current.handle {
            self.cancel_remote(old).await;
        }

        let mut scheduling_error = None;
        let handle = match fire_at {
            Some(at) => match self
                .retry
                .run("schedule", || self.scheduler.schedule(subscription.id, at))
                .await
            {
                Ok(handle) => Some(handle),
                Err(e) => {
                    scheduling_error = Some(e);
                    None
                }
            },
            None => None,
        };

        let next = ReminderWorkflow {
            subscription_id: subscription.id,
            handle: handle.clone(),
            next_fire_at: handle.as_ref().and(fire_at),
            last_evaluated_at: evaluated_at.or(current.last_evaluated_at),
            version: current.version,
            updated_at: now,
        };

        let stored = match self.workflows.compare_and_set(next, current.version).await {
            Ok(stored) => stored,
            Err(e) => {
                if let Some(fresh) = &handle {
                    self.cancel_remote(fresh).await;
                }
                if e.kind == ErrorKind::Conflict {
                    warn!(subscription_id = %subscription.id, "Lost workflow update race");
                }
                return Err(e);
            }
        };

        if let Some(e) = scheduling_error {
            warn!(
                subscription_id = %subscription.id,
                error = %e,
                "Scheduler rejected reminder callback; workflow left without handle"
            );
            return Err(AppError::with_source(
                ErrorKind::ExternalService,
                format!("Failed to schedule reminder for subscription {}", subscription.id),
                e,
            ));
        }

        debug!(
            subscription_id = %subscription.id,
            next_fire_at = ?stored.next_fire_at,
            version = stored.version,
            "Workflow scheduled"
        );
        Ok(stored)
    }

    /// Remote cancel with retries; failures are only logged since the
    /// fire-time handle check drops whatever still arrives.
    async fn cancel_remote(&self, handle: &WorkflowHandle) {
        if let Err(e) = self
            .retry
            .run("cancel", || self.scheduler.cancel(handle))
            .await
        {
            warn!(handle = %handle, error = %e, "Failed to cancel scheduled callback");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use subtrack_core::types::id::UserId;
    use subtrack_core::types::pagination::PageRequest;
    use subtrack_database::Storage;
    use subtrack_entity::notification::{NotificationFilter, NotificationKind, NotificationPriority};

    use crate::testing::{self, FakeScheduler, now};

    struct Fixture {
        storage: Storage,
        scheduler: Arc<FakeScheduler>,
        coordinator: ReminderCoordinator,
    }

    fn fixture() -> Fixture {
        let storage = Storage::in_memory();
        let scheduler = FakeScheduler::new();
        let coordinator = ReminderCoordinator::new(
            storage.subscriptions.clone(),
            storage.workflows.clone(),
            scheduler.clone(),
            testing::generator(&storage),
            ReminderConfig::default(),
        )
        .with_retry(RetryPolicy::new(3, std::time::Duration::from_millis(1)));
        Fixture {
            storage,
            scheduler,
            coordinator,
        }
    }

    async fn insert(f: &Fixture, status: SubscriptionStatus, renews_in: Duration) -> Subscription {
        let sub = testing::subscription(UserId::new(), status, renews_in, now());
        f.storage.subscriptions.insert(sub).await.unwrap()
    }

    async fn notifications(f: &Fixture, user: UserId) -> Vec<subtrack_entity::notification::Notification> {
        f.storage
            .notifications
            .list(user, NotificationFilter::default(), PageRequest::default())
            .await
            .unwrap()
            .items
    }

    #[tokio::test]
    async fn test_renewal_tomorrow_fires_high_priority() {
        let f = fixture();
        let sub = insert(&f, SubscriptionStatus::Active, Duration::days(1)).await;

        let evaluation = f.coordinator.evaluate(&sub, now()).await.unwrap();
        assert_eq!(evaluation.created_count(), 1);

        let items = notifications(&f, sub.user_id).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].kind, NotificationKind::Renewal);
        assert_eq!(items[0].priority, NotificationPriority::High);
        assert_eq!(items[0].metadata.days_until_renewal, Some(1));
        assert!(items[0].title.contains("renews tomorrow"));

        let again = f.coordinator.evaluate(&sub, now()).await.unwrap();
        assert_eq!(again.created_count(), 0);
        assert_eq!(notifications(&f, sub.user_id).await.len(), 1);
    }

    #[tokio::test]
    async fn test_no_reminder_outside_offsets() {
        let f = fixture();
        let sub = insert(&f, SubscriptionStatus::Active, Duration::days(5)).await;
        let evaluation = f.coordinator.evaluate(&sub, now()).await.unwrap();
        assert!(evaluation.notifications.is_empty());
    }

    #[tokio::test]
    async fn test_inactive_subscription_gets_nothing() {
        let f = fixture();
        let sub = insert(&f, SubscriptionStatus::Cancelled, Duration::days(1)).await;
        let evaluation = f.coordinator.evaluate(&sub, now()).await.unwrap();
        assert!(evaluation.notifications.is_empty());
        assert!(!evaluation.expired);
    }

    #[tokio::test]
    async fn test_lapsed_subscription_expires_once() {
        let f = fixture();
        let sub = insert(&f, SubscriptionStatus::Active, -Duration::hours(1)).await;

        let evaluation = f.coordinator.evaluate(&sub, now()).await.unwrap();
        assert!(evaluation.expired);
        let stored = f.storage.subscriptions.find_by_id(sub.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Expired);

        let items = notifications(&f, sub.user_id).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].kind, NotificationKind::Warning);
        assert_eq!(items[0].priority, NotificationPriority::High);

        let again = f.coordinator.evaluate(&sub, now()).await.unwrap();
        assert!(!again.expired);
    }

    #[tokio::test]
    async fn test_trial_ending_fires() {
        let f = fixture();
        let mut sub = testing::subscription(
            UserId::new(),
            SubscriptionStatus::Trial,
            Duration::days(20),
            now(),
        );
        sub.trial_end_date = Some(now() + Duration::days(3));
        let sub = f.storage.subscriptions.insert(sub).await.unwrap();

        f.coordinator.evaluate(&sub, now()).await.unwrap();
        let items = notifications(&f, sub.user_id).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].kind, NotificationKind::TrialEnding);
    }

    #[tokio::test]
    async fn test_schedule_replaces_existing_handle() {
        let f = fixture();
        let sub = insert(&f, SubscriptionStatus::Active, Duration::days(5)).await;

        let first = f.coordinator.schedule_workflow(&sub, now()).await.unwrap();
        let second = f.coordinator.schedule_workflow(&sub, now()).await.unwrap();

        assert_eq!(first.version, 1);
        assert_eq!(second.version, 2);
        assert_ne!(first.handle, second.handle);
        assert_eq!(f.scheduler.cancelled().await, vec![first.handle.unwrap()]);
        assert_eq!(f.scheduler.scheduled().await.len(), 2);
    }

    #[tokio::test]
    async fn test_racing_schedules_leave_one_live_handle() {
        let f = fixture();
        let sub = insert(&f, SubscriptionStatus::Active, Duration::days(5)).await;

        let (a, b) = tokio::join!(
            f.coordinator.schedule_workflow(&sub, now()),
            f.coordinator.schedule_workflow(&sub, now()),
        );
        assert!(a.is_ok() || b.is_ok());
        for result in [&a, &b] {
            if let Err(e) = result {
                assert_eq!(e.kind, ErrorKind::Conflict);
            }
        }

        let workflow = f.storage.workflows.get(sub.id).await.unwrap().unwrap();
        let live = workflow.handle.unwrap();
        let cancelled = f.scheduler.cancelled().await;
        assert!(!cancelled.contains(&live));

        let scheduled = f.scheduler.scheduled().await;
        assert_eq!(scheduled.len(), 2);
        for (_, _, handle) in scheduled {
            if handle != live {
                assert!(cancelled.contains(&handle), "{handle} left running");
            }
        }
    }

    #[tokio::test]
    async fn test_cancel_without_handle_is_noop() {
        let f = fixture();
        let sub = insert(&f, SubscriptionStatus::Active, Duration::days(5)).await;
        f.coordinator.cancel(sub.id, now()).await.unwrap();
        assert!(f.scheduler.calls.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_clears_handle_even_when_scheduler_fails() {
        let f = fixture();
        let sub = insert(&f, SubscriptionStatus::Active, Duration::days(5)).await;
        f.coordinator.schedule_workflow(&sub, now()).await.unwrap();

        f.scheduler.fail_next(10);
        f.coordinator.cancel(sub.id, now()).await.unwrap();

        let workflow = f.storage.workflows.get(sub.id).await.unwrap().unwrap();
        assert!(workflow.handle.is_none());
    }

    #[tokio::test]
    async fn test_schedule_retries_transient_failures() {
        let f = fixture();
        let sub = insert(&f, SubscriptionStatus::Active, Duration::days(5)).await;
        f.scheduler.fail_next(2);

        let workflow = f.coordinator.schedule_workflow(&sub, now()).await.unwrap();
        assert!(workflow.handle.is_some());
    }

    #[tokio::test]
    async fn test_schedule_failure_keeps_local_state() {
        let f = fixture();
        let sub = insert(&f, SubscriptionStatus::Active, Duration::days(5)).await;
        f.scheduler.fail_next(3);

        let err = f.coordinator.schedule_workflow(&sub, now()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ExternalService);
        let workflow = f.storage.workflows.get(sub.id).await.unwrap().unwrap();
        assert!(workflow.handle.is_none());
    }

    #[tokio::test]
    async fn test_stale_callback_is_dropped() {
        let f = fixture();
        let sub = insert(&f, SubscriptionStatus::Active, Duration::days(1)).await;
        f.coordinator.schedule_workflow(&sub, now()).await.unwrap();

        let outcome = f
            .coordinator
            .fire(sub.id, &WorkflowHandle::new("cb-old"), now())
            .await
            .unwrap();
        assert!(matches!(outcome, FireOutcome::Stale));
        assert!(notifications(&f, sub.user_id).await.is_empty());
    }

    #[tokio::test]
    async fn test_fire_evaluates_and_reschedules() {
        let f = fixture();
        let sub = insert(&f, SubscriptionStatus::Active, Duration::days(1)).await;
        let workflow = f.coordinator.schedule_workflow(&sub, now()).await.unwrap();
        let handle = workflow.handle.unwrap();

        let outcome = f.coordinator.fire(sub.id, &handle, now()).await.unwrap();
        let FireOutcome::Evaluated(evaluation) = outcome else {
            panic!("expected evaluation");
        };
        assert_eq!(evaluation.created_count(), 1);

        let status = f.coordinator.status(sub.id).await.unwrap();
        assert!(status.has_handle);
        assert_ne!(status.handle, Some(handle));
        assert_eq!(status.last_evaluated_at, Some(now()));
        assert_eq!(status.scheduler_status, Some(ScheduledCallbackStatus::Pending));
    }

    #[tokio::test]
    async fn test_status_change_to_cancelled_clears_workflow() {
        let f = fixture();
        let mut sub = insert(&f, SubscriptionStatus::Active, Duration::days(5)).await;
        f.coordinator.schedule_workflow(&sub, now()).await.unwrap();

        sub.status = SubscriptionStatus::Cancelled;
        let generated = f
            .coordinator
            .on_status_changed(&sub, SubscriptionStatus::Active, now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(generated.notification().kind, NotificationKind::Info);
        assert_eq!(generated.notification().priority, NotificationPriority::Low);

        let status = f.coordinator.status(sub.id).await.unwrap();
        assert!(!status.has_handle);
    }

    #[tokio::test]
    async fn test_update_dispatches_price_change() {
        let f = fixture();
        let before = insert(&f, SubscriptionStatus::Active, Duration::days(5)).await;
        let mut after = before.clone();
        after.price = 12.0;

        let generated = f
            .coordinator
            .on_subscription_updated(&before, &after, now())
            .await
            .unwrap();
        assert_eq!(generated.len(), 1);
        assert_eq!(generated[0].notification().kind, NotificationKind::PriceChange);
    }

    #[tokio::test]
    async fn test_sweep_expires_and_schedules() {
        let f = fixture();
        insert(&f, SubscriptionStatus::Active, -Duration::hours(2)).await;
        insert(&f, SubscriptionStatus::Active, Duration::days(3)).await;
        insert(&f, SubscriptionStatus::Suspended, Duration::days(3)).await;

        let report = f.coordinator.sweep(now()).await.unwrap();
        assert_eq!(report.evaluated, 2);
        assert_eq!(report.expired, 1);
        assert_eq!(report.notifications_created, 2);
        assert_eq!(report.rescheduled, 1);

        let again = f.coordinator.sweep(now()).await.unwrap();
        assert_eq!(again.evaluated, 1);
        assert_eq!(again.notifications_created, 0);
        assert_eq!(again.rescheduled, 0);
    }
}
