//! In-memory subscription store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use subtrack_core::AppError;
use subtrack_core::result::AppResult;
use subtrack_core::types::id::SubscriptionId;
use subtrack_entity::subscription::{Subscription, SubscriptionStatus};

use crate::store::SubscriptionStore;

#[derive(Debug, Default)]
pub struct MemorySubscriptionStore {
    rows: DashMap<SubscriptionId, Subscription>,
}

impl MemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubscriptionStore for MemorySubscriptionStore {
    async fn find_by_id(&self, id: SubscriptionId) -> AppResult<Option<Subscription>> {
        Ok(self.rows.get(&id).map(|s| s.clone()))
    }

    async fn list_remindable(&self) -> AppResult<Vec<Subscription>> {
        let mut subs: Vec<Subscription> = self
            .rows
            .iter()
            .filter(|s| s.status.receives_reminders())
            .map(|s| s.clone())
            .collect();
        subs.sort_by_key(|s| s.renewal_date);
        Ok(subs)
    }

    async fn insert(&self, subscription: Subscription) -> AppResult<Subscription> {
        if self.rows.contains_key(&subscription.id) {
            return Err(AppError::conflict(format!(
                "Subscription {} already exists",
                subscription.id
            )));
        }
        self.rows.insert(subscription.id, subscription.clone());
        Ok(subscription)
    }

    async fn update(&self, subscription: Subscription) -> AppResult<Option<Subscription>> {
        let Some(mut row) = self.rows.get_mut(&subscription.id) else {
            return Ok(None);
        };
        *row = subscription;
        Ok(Some(row.clone()))
    }

    async fn transition_status(
        &self,
        id: SubscriptionId,
        from: SubscriptionStatus,
        to: SubscriptionStatus,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Subscription>> {
        let Some(mut row) = self.rows.get_mut(&id) else {
            return Ok(None);
        };
        if row.status != from {
            return Ok(None);
        }
        row.status = to;
        row.updated_at = now;
        Ok(Some(row.clone()))
    }
}
