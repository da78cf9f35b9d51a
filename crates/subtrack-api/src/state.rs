//! Shared application state available to all handlers.

use std::sync::Arc;

use subtrack_core::config::AppConfig;
use subtrack_core::traits::scheduler::ReminderScheduler;
use subtrack_database::Storage;
use subtrack_service::{
    GroupService, NotificationGenerator, NotificationService, PaymentTracker,
    ReminderCoordinator, WebhookService,
};

/// Application state shared across all request handlers via Axum's `State`.
#[derive(Clone)]
pub struct AppState {
    /// Full application configuration.
    pub config: Arc<AppConfig>,
    /// Storage backend.
    pub storage: Storage,
    /// The single notification funnel.
    pub generator: Arc<NotificationGenerator>,
    /// Per-user notification reads and mutations.
    pub notification_service: Arc<NotificationService>,
    /// Sharing groups and split configuration.
    pub group_service: Arc<GroupService>,
    /// Shared payment lifecycle.
    pub payment_tracker: Arc<PaymentTracker>,
    /// Reminder workflows.
    pub reminder_coordinator: Arc<ReminderCoordinator>,
    /// Payment-provider webhook mapping.
    pub webhook_service: Arc<WebhookService>,
}

impl AppState {
    /// Wire the services over a storage backend and a reminder scheduler.
    pub fn new(
        config: AppConfig,
        storage: Storage,
        scheduler: Arc<dyn ReminderScheduler>,
    ) -> Self {
        let generator = Arc::new(NotificationGenerator::new(
            Arc::clone(&storage.notifications),
            config.notifications.clone(),
        ));
        let notification_service = Arc::new(NotificationService::new(
            Arc::clone(&storage.notifications),
            Arc::clone(&generator),
        ));
        let group_service = Arc::new(GroupService::new(Arc::clone(&storage.groups)));
        let payment_tracker = Arc::new(PaymentTracker::new(
            Arc::clone(&storage.payments),
            Arc::clone(&storage.groups),
            Arc::clone(&storage.subscriptions),
            Arc::clone(&generator),
        ));
        let reminder_coordinator = Arc::new(ReminderCoordinator::new(
            Arc::clone(&storage.subscriptions),
            Arc::clone(&storage.workflows),
            scheduler,
            Arc::clone(&generator),
            config.reminders.clone(),
        ));
        let webhook_service = Arc::new(WebhookService::new(
            Arc::clone(&storage.subscriptions),
            Arc::clone(&storage.payments),
            Arc::clone(&payment_tracker),
            Arc::clone(&generator),
        ));

        Self {
            config: Arc::new(config),
            storage,
            generator,
            notification_service,
            group_service,
            payment_tracker,
            reminder_coordinator,
            webhook_service,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
