//! The single funnel through which notifications are created.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use subtrack_core::config::notification::NotificationConfig;
use subtrack_core::result::AppResult;
use subtrack_core::types::id::{SubscriptionId, UserId};
use subtrack_database::NotificationStore;
use subtrack_entity::notification::{EventFacts, Generated, NewNotification};

use super::policy::priority_for;
use super::templates::render;

/// Validates facts, deduplicates and persists notifications.
#[derive(Clone)]
pub struct NotificationGenerator {
    store: Arc<dyn NotificationStore>,
    config: NotificationConfig,
}

impl std::fmt::Debug for NotificationGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationGenerator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl NotificationGenerator {
    /// Creates a new generator.
    pub fn new(store: Arc<dyn NotificationStore>, config: NotificationConfig) -> Self {
        Self { store, config }
    }

    /// Create a notification for `facts` unless an identical one was created
    /// inside the dedup window, in which case that one is returned.
    pub async fn generate(
        &self,
        user_id: UserId,
        subscription_id: Option<SubscriptionId>,
        facts: &EventFacts,
        now: DateTime<Utc>,
    ) -> AppResult<Generated> {
        facts.validate()?;

        let kind = facts.kind();
        let dedup_key = dedup_key(user_id, subscription_id, facts);
        let rendered = render(facts);

        let new = NewNotification {
            user_id,
            subscription_id,
            kind,
            title: rendered.title,
            message: rendered.message,
            priority: priority_for(facts),
            metadata: facts.metadata(),
            dedup_key,
            created_at: now,
            expires_at: now + Duration::days(self.config.expiry_days),
        };
        let window_start = now - Duration::hours(self.config.dedup_window_hours);

        let generated = self.store.find_or_insert(new, window_start).await?;

        match &generated {
            Generated::Created(n) => info!(
                notification_id = %n.id,
                user_id = %user_id,
                kind = %kind,
                priority = ?n.priority,
                "Notification created"
            ),
            Generated::Existing(n) => debug!(
                notification_id = %n.id,
                user_id = %user_id,
                kind = %kind,
                "Duplicate notification suppressed"
            ),
        }

        Ok(generated)
    }

    /// Delete read notifications older than the retention period.
    pub async fn cleanup(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let cutoff = now - Duration::days(self.config.retention_days);
        let deleted = self.store.delete_read_before(cutoff).await?;
        if deleted > 0 {
            info!(deleted, cutoff = %cutoff, "Removed read notifications past retention");
        }
        Ok(deleted)
    }
}

/// `user:subscription:kind:fact`, stable across calls for the same event.
fn dedup_key(
    user_id: UserId,
    subscription_id: Option<SubscriptionId>,
    facts: &EventFacts,
) -> String {
    let subscription = subscription_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "none".to_string());
    let fact = facts.discriminator().unwrap_or_else(|| "-".to_string());
    format!("{user_id}:{subscription}:{}:{fact}", facts.kind())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use subtrack_core::types::pagination::PageRequest;
    use subtrack_database::Storage;
    use subtrack_entity::notification::{NotificationFilter, NotificationKind, NotificationPriority};

    fn generator(storage: &Storage) -> NotificationGenerator {
        NotificationGenerator::new(storage.notifications.clone(), NotificationConfig::default())
    }

    fn renewal(days: i64, now: DateTime<Utc>) -> EventFacts {
        EventFacts::Renewal {
            subscription_name: "Netflix".to_string(),
            price: 9.99,
            currency: "USD".to_string(),
            renewal_date: now + Duration::days(days),
            days_until_renewal: days,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_generate_twice_stores_one() {
        let storage = Storage::in_memory();
        let generator = generator(&storage);
        let user = UserId::new();
        let sub = SubscriptionId::new();

        let first = generator
            .generate(user, Some(sub), &renewal(3, now()), now())
            .await
            .unwrap();
        let second = generator
            .generate(user, Some(sub), &renewal(3, now()), now() + Duration::hours(5))
            .await
            .unwrap();

        assert!(first.is_created());
        assert!(!second.is_created());
        assert_eq!(first.notification().id, second.notification().id);

        let page = storage
            .notifications
            .list(user, NotificationFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total_items, 1);
    }

    #[tokio::test]
    async fn test_concurrent_generate_stores_one() {
        let storage = Storage::in_memory();
        let generator = generator(&storage);
        let user = UserId::new();
        let sub = SubscriptionId::new();
        let facts = renewal(3, now());

        let (a, b) = tokio::join!(
            generator.generate(user, Some(sub), &facts, now()),
            generator.generate(user, Some(sub), &facts, now()),
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_ne!(a.is_created(), b.is_created());
        assert_eq!(a.notification().id, b.notification().id);

        let page = storage
            .notifications
            .list(user, NotificationFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total_items, 1);
    }

    #[tokio::test]
    async fn test_generate_after_window_creates_again() {
        let storage = Storage::in_memory();
        let generator = generator(&storage);
        let user = UserId::new();
        let sub = SubscriptionId::new();

        generator
            .generate(user, Some(sub), &renewal(3, now()), now())
            .await
            .unwrap();
        let later = generator
            .generate(user, Some(sub), &renewal(3, now()), now() + Duration::hours(25))
            .await
            .unwrap();
        assert!(later.is_created());
    }

    #[tokio::test]
    async fn test_different_bucket_is_not_a_duplicate() {
        let storage = Storage::in_memory();
        let generator = generator(&storage);
        let user = UserId::new();
        let sub = SubscriptionId::new();

        generator
            .generate(user, Some(sub), &renewal(3, now()), now())
            .await
            .unwrap();
        let next = generator
            .generate(user, Some(sub), &renewal(1, now()), now())
            .await
            .unwrap();
        assert!(next.is_created());
    }

    #[tokio::test]
    async fn test_renewal_tomorrow_is_high_priority() {
        let storage = Storage::in_memory();
        let generated = generator(&storage)
            .generate(UserId::new(), Some(SubscriptionId::new()), &renewal(1, now()), now())
            .await
            .unwrap();

        let n = generated.notification();
        assert_eq!(n.kind, NotificationKind::Renewal);
        assert_eq!(n.priority, NotificationPriority::High);
        assert!(n.title.contains("renews tomorrow"));
        assert_eq!(n.metadata.days_until_renewal, Some(1));
        assert_eq!(n.expires_at, now() + Duration::days(30));
    }

    #[tokio::test]
    async fn test_price_increase_metadata() {
        let storage = Storage::in_memory();
        let facts = EventFacts::PriceChange {
            subscription_name: "Spotify".to_string(),
            currency: "USD".to_string(),
            old_price: 10.0,
            new_price: 12.0,
        };
        let generated = generator(&storage)
            .generate(UserId::new(), Some(SubscriptionId::new()), &facts, now())
            .await
            .unwrap();

        let n = generated.notification();
        assert_eq!(n.kind, NotificationKind::PriceChange);
        assert_eq!(n.priority, NotificationPriority::Medium);
        assert_eq!(n.metadata.old_price, Some(10.0));
        assert_eq!(n.metadata.new_price, Some(12.0));
    }

    #[tokio::test]
    async fn test_invalid_facts_store_nothing() {
        let storage = Storage::in_memory();
        let user = UserId::new();
        let facts = EventFacts::PriceChange {
            subscription_name: "Spotify".to_string(),
            currency: "USD".to_string(),
            old_price: 10.0,
            new_price: 10.0,
        };
        let err = generator(&storage)
            .generate(user, None, &facts, now())
            .await
            .unwrap_err();
        assert_eq!(err.kind, subtrack_core::error::ErrorKind::Validation);
        assert_eq!(storage.notifications.count_unread(user).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cleanup_is_idempotent() {
        let storage = Storage::in_memory();
        let generator = generator(&storage);
        let user = UserId::new();
        let old = now() - Duration::days(40);

        let stale = generator
            .generate(user, None, &renewal(3, old), old)
            .await
            .unwrap()
            .into_notification();
        let fresh = generator
            .generate(user, None, &renewal(7, now()), now())
            .await
            .unwrap()
            .into_notification();
        for id in [stale.id, fresh.id] {
            storage.notifications.set_read(user, id, true, now()).await.unwrap();
        }

        assert_eq!(generator.cleanup(now()).await.unwrap(), 1);
        assert_eq!(generator.cleanup(now()).await.unwrap(), 0);
        assert!(storage.notifications.find_by_id(stale.id).await.unwrap().is_none());
        assert!(storage.notifications.find_by_id(fresh.id).await.unwrap().is_some());
    }
}
