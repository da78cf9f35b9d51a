//! User-facing notification management: list, read state and deletion.

use std::sync::Arc;

use tracing::info;

use subtrack_core::error::AppError;
use subtrack_core::types::id::{NotificationId, SubscriptionId};
use subtrack_core::types::pagination::{PageRequest, PageResponse};
use subtrack_database::NotificationStore;
use subtrack_entity::notification::{EventFacts, Generated, Notification, NotificationFilter};

use super::generator::NotificationGenerator;
use crate::context::RequestContext;

/// Manages the current user's notifications.
#[derive(Clone)]
pub struct NotificationService {
    /// Notification store.
    store: Arc<dyn NotificationStore>,
    /// Generator used for explicit creation requests.
    generator: Arc<NotificationGenerator>,
}

impl std::fmt::Debug for NotificationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationService").finish_non_exhaustive()
    }
}

impl NotificationService {
    /// Creates a new notification service.
    pub fn new(store: Arc<dyn NotificationStore>, generator: Arc<NotificationGenerator>) -> Self {
        Self { store, generator }
    }

    /// Creates a notification for the current user from event facts.
    pub async fn create(
        &self,
        ctx: &RequestContext,
        subscription_id: Option<SubscriptionId>,
        facts: &EventFacts,
    ) -> Result<Generated, AppError> {
        self.generator
            .generate(ctx.user_id, subscription_id, facts, ctx.request_time)
            .await
    }

    /// Lists notifications for the current user, newest first.
    pub async fn list(
        &self,
        ctx: &RequestContext,
        filter: NotificationFilter,
        page: PageRequest,
    ) -> Result<PageResponse<Notification>, AppError> {
        self.store.list(ctx.user_id, filter, page).await
    }

    /// Gets the unread notification count.
    pub async fn unread_count(&self, ctx: &RequestContext) -> Result<u64, AppError> {
        self.store.count_unread(ctx.user_id).await
    }

    /// Marks a notification as read.
    pub async fn mark_read(
        &self,
        ctx: &RequestContext,
        id: NotificationId,
    ) -> Result<Notification, AppError> {
        self.set_read(ctx, id, true).await
    }

    /// Marks a notification as unread.
    pub async fn mark_unread(
        &self,
        ctx: &RequestContext,
        id: NotificationId,
    ) -> Result<Notification, AppError> {
        self.set_read(ctx, id, false).await
    }

    async fn set_read(
        &self,
        ctx: &RequestContext,
        id: NotificationId,
        read: bool,
    ) -> Result<Notification, AppError> {
        self.store
            .set_read(ctx.user_id, id, read, ctx.request_time)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Notification {id} not found")))
    }

    /// Marks all notifications as read for the current user.
    pub async fn mark_all_read(&self, ctx: &RequestContext) -> Result<u64, AppError> {
        let updated = self
            .store
            .mark_all_read(ctx.user_id, ctx.request_time)
            .await?;
        info!(user_id = %ctx.user_id, updated, "Marked all notifications read");
        Ok(updated)
    }

    /// Marks the listed notifications as read. Ids of other users are ignored.
    pub async fn mark_read_bulk(
        &self,
        ctx: &RequestContext,
        ids: &[NotificationId],
    ) -> Result<u64, AppError> {
        if ids.is_empty() {
            return Err(AppError::validation("At least one notification id is required"));
        }
        self.store
            .mark_read_bulk(ctx.user_id, ids, ctx.request_time)
            .await
    }

    /// Deletes one notification.
    pub async fn delete(&self, ctx: &RequestContext, id: NotificationId) -> Result<(), AppError> {
        if self.store.delete(ctx.user_id, id).await? {
            Ok(())
        } else {
            Err(AppError::not_found(format!("Notification {id} not found")))
        }
    }

    /// Deletes all of the user's notifications.
    pub async fn delete_all(&self, ctx: &RequestContext) -> Result<u64, AppError> {
        let deleted = self.store.delete_all(ctx.user_id).await?;
        info!(user_id = %ctx.user_id, deleted, "Deleted all notifications");
        Ok(deleted)
    }

    /// Deletes the user's read notifications.
    pub async fn delete_read(&self, ctx: &RequestContext) -> Result<u64, AppError> {
        self.store.delete_read(ctx.user_id).await
    }

    /// Deletes the listed notifications.
    pub async fn delete_bulk(
        &self,
        ctx: &RequestContext,
        ids: &[NotificationId],
    ) -> Result<u64, AppError> {
        if ids.is_empty() {
            return Err(AppError::validation("At least one notification id is required"));
        }
        self.store.delete_bulk(ctx.user_id, ids).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use subtrack_core::config::notification::NotificationConfig;
    use subtrack_core::error::ErrorKind;
    use subtrack_core::types::id::UserId;
    use subtrack_database::Storage;

    fn service(storage: &Storage) -> NotificationService {
        let generator = Arc::new(NotificationGenerator::new(
            storage.notifications.clone(),
            NotificationConfig::default(),
        ));
        NotificationService::new(storage.notifications.clone(), generator)
    }

    fn alert(amount: f64) -> EventFacts {
        EventFacts::SpendingAlert {
            amount,
            threshold: 50.0,
            currency: "USD".to_string(),
        }
    }

    #[tokio::test]
    async fn test_read_unread_cycle() {
        let storage = Storage::in_memory();
        let service = service(&storage);
        let ctx = RequestContext::new(UserId::new(), false);

        let n = service
            .create(&ctx, None, &alert(80.0))
            .await
            .unwrap()
            .into_notification();
        assert_eq!(service.unread_count(&ctx).await.unwrap(), 1);

        let read = service.mark_read(&ctx, n.id).await.unwrap();
        assert!(read.read);
        assert!(read.read_at.is_some());
        assert_eq!(service.unread_count(&ctx).await.unwrap(), 0);

        let unread = service.mark_unread(&ctx, n.id).await.unwrap();
        assert!(!unread.read);
        assert!(unread.read_at.is_none());
    }

    #[tokio::test]
    async fn test_other_users_notification_is_not_found() {
        let storage = Storage::in_memory();
        let service = service(&storage);
        let owner = RequestContext::new(UserId::new(), false);
        let other = RequestContext::new(UserId::new(), false);

        let n = service
            .create(&owner, None, &alert(80.0))
            .await
            .unwrap()
            .into_notification();

        let err = service.mark_read(&other, n.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        let err = service.delete(&other, n.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_delete_read_keeps_unread() {
        let storage = Storage::in_memory();
        let service = service(&storage);
        let mut ctx = RequestContext::new(UserId::new(), false);

        let first = service
            .create(&ctx, None, &alert(80.0))
            .await
            .unwrap()
            .into_notification();
        ctx.request_time += Duration::days(2);
        service.create(&ctx, None, &alert(90.0)).await.unwrap();

        service.mark_read(&ctx, first.id).await.unwrap();
        assert_eq!(service.delete_read(&ctx).await.unwrap(), 1);

        let page = service
            .list(&ctx, NotificationFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total_items, 1);
        assert!(!page.items[0].read);
    }

    #[tokio::test]
    async fn test_bulk_requires_ids() {
        let storage = Storage::in_memory();
        let service = service(&storage);
        let ctx = RequestContext::new(UserId::new(), false);
        let err = service.mark_read_bulk(&ctx, &[]).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }
}
