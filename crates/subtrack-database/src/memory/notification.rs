//! In-memory notification store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use subtrack_core::result::AppResult;
use subtrack_core::types::id::{NotificationId, UserId};
use subtrack_core::types::pagination::{PageRequest, PageResponse};
use subtrack_entity::notification::{Generated, NewNotification, Notification, NotificationFilter};

use crate::store::NotificationStore;

/// Notifications behind one async mutex, so the dedup lookup and the
/// insert happen under the same guard.
#[derive(Debug, Default)]
pub struct MemoryNotificationStore {
    rows: Mutex<HashMap<NotificationId, Notification>>,
}

impl MemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn find_or_insert(
        &self,
        new: NewNotification,
        window_start: DateTime<Utc>,
    ) -> AppResult<Generated> {
        let mut rows = self.rows.lock().await;
        let existing = rows
            .values()
            .filter(|n| n.dedup_key == new.dedup_key && n.created_at > window_start)
            .max_by_key(|n| n.created_at)
            .cloned();
        if let Some(found) = existing {
            return Ok(Generated::Existing(found));
        }
        let notification = new.into_notification();
        rows.insert(notification.id, notification.clone());
        Ok(Generated::Created(notification))
    }

    async fn find_by_id(&self, id: NotificationId) -> AppResult<Option<Notification>> {
        Ok(self.rows.lock().await.get(&id).cloned())
    }

    async fn list(
        &self,
        user_id: UserId,
        filter: NotificationFilter,
        page: PageRequest,
    ) -> AppResult<PageResponse<Notification>> {
        let rows = self.rows.lock().await;
        let mut matching: Vec<Notification> = rows
            .values()
            .filter(|n| n.user_id == user_id && filter.matches(n))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect();
        Ok(PageResponse::new(items, page.page, page.page_size, total))
    }

    async fn count_unread(&self, user_id: UserId) -> AppResult<u64> {
        let rows = self.rows.lock().await;
        Ok(rows
            .values()
            .filter(|n| n.user_id == user_id && !n.read)
            .count() as u64)
    }

    async fn set_read(
        &self,
        user_id: UserId,
        id: NotificationId,
        read: bool,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Notification>> {
        let mut rows = self.rows.lock().await;
        let Some(n) = rows.get_mut(&id).filter(|n| n.user_id == user_id) else {
            return Ok(None);
        };
        n.read = read;
        n.read_at = if read { n.read_at.or(Some(now)) } else { None };
        Ok(Some(n.clone()))
    }

    async fn mark_all_read(&self, user_id: UserId, now: DateTime<Utc>) -> AppResult<u64> {
        let mut rows = self.rows.lock().await;
        let mut changed = 0;
        for n in rows.values_mut().filter(|n| n.user_id == user_id && !n.read) {
            n.read = true;
            n.read_at = Some(now);
            changed += 1;
        }
        Ok(changed)
    }

    async fn mark_read_bulk(
        &self,
        user_id: UserId,
        ids: &[NotificationId],
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let mut rows = self.rows.lock().await;
        let mut changed = 0;
        for n in rows
            .values_mut()
            .filter(|n| n.user_id == user_id && !n.read && ids.contains(&n.id))
        {
            n.read = true;
            n.read_at = Some(now);
            changed += 1;
        }
        Ok(changed)
    }

    async fn delete(&self, user_id: UserId, id: NotificationId) -> AppResult<bool> {
        let mut rows = self.rows.lock().await;
        if rows.get(&id).is_some_and(|n| n.user_id == user_id) {
            rows.remove(&id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn delete_all(&self, user_id: UserId) -> AppResult<u64> {
        let mut rows = self.rows.lock().await;
        let before = rows.len();
        rows.retain(|_, n| n.user_id != user_id);
        Ok((before - rows.len()) as u64)
    }

    async fn delete_read(&self, user_id: UserId) -> AppResult<u64> {
        let mut rows = self.rows.lock().await;
        let before = rows.len();
        rows.retain(|_, n| !(n.user_id == user_id && n.read));
        Ok((before - rows.len()) as u64)
    }

    async fn delete_bulk(&self, user_id: UserId, ids: &[NotificationId]) -> AppResult<u64> {
        let mut rows = self.rows.lock().await;
        let before = rows.len();
        rows.retain(|id, n| !(n.user_id == user_id && ids.contains(id)));
        Ok((before - rows.len()) as u64)
    }

    async fn delete_read_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let mut rows = self.rows.lock().await;
        let before = rows.len();
        rows.retain(|_, n| !(n.read && n.created_at < cutoff));
        Ok((before - rows.len()) as u64)
    }
}
