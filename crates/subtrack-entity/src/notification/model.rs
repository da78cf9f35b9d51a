//! Notification entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use subtrack_core::types::id::{NotificationId, SubscriptionId, UserId};

use super::kind::NotificationKind;
use super::metadata::NotificationMetadata;
use super::priority::NotificationPriority;

/// A notification delivered to a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Notification {
    /// Unique notification identifier.
    pub id: NotificationId,
    /// The recipient user.
    pub user_id: UserId,
    /// The subscription this notification is about, if any.
    pub subscription_id: Option<SubscriptionId>,
    /// Notification kind.
    pub kind: NotificationKind,
    /// Derived title.
    pub title: String,
    /// Derived body text.
    pub message: String,
    /// Whether the user has read this notification.
    pub read: bool,
    /// When the notification was read.
    pub read_at: Option<DateTime<Utc>>,
    /// Priority level.
    pub priority: NotificationPriority,
    /// Kind-specific structured data.
    pub metadata: Json<NotificationMetadata>,
    /// Deduplication key (user, subscription, kind, discriminating fact).
    #[serde(skip_serializing)]
    pub dedup_key: String,
    /// When the notification was created.
    pub created_at: DateTime<Utc>,
    /// When the notification expires.
    pub expires_at: DateTime<Utc>,
}

/// A fully synthesized notification ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub user_id: UserId,
    pub subscription_id: Option<SubscriptionId>,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub priority: NotificationPriority,
    pub metadata: NotificationMetadata,
    pub dedup_key: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl NewNotification {
    /// Materialize the stored row.
    pub fn into_notification(self) -> Notification {
        Notification {
            id: NotificationId::new(),
            user_id: self.user_id,
            subscription_id: self.subscription_id,
            kind: self.kind,
            title: self.title,
            message: self.message,
            read: false,
            read_at: None,
            priority: self.priority,
            metadata: Json(self.metadata),
            dedup_key: self.dedup_key,
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}

/// Optional filters for listing a user's notifications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationFilter {
    /// Only read (`true`) or unread (`false`) notifications.
    pub read: Option<bool>,
    /// Only notifications of this kind.
    pub kind: Option<NotificationKind>,
    /// Only notifications with this priority.
    pub priority: Option<NotificationPriority>,
}

impl NotificationFilter {
    /// Check a notification against the filter.
    pub fn matches(&self, notification: &Notification) -> bool {
        self.read.is_none_or(|r| notification.read == r)
            && self.kind.is_none_or(|k| notification.kind == k)
            && self.priority.is_none_or(|p| notification.priority == p)
    }
}

/// Outcome of a deduplicated notification insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "notification", rename_all = "snake_case")]
pub enum Generated {
    /// A new row was stored.
    Created(Notification),
    /// An identical notification already existed inside the dedup window.
    Existing(Notification),
}

impl Generated {
    /// The stored notification, new or existing.
    pub fn notification(&self) -> &Notification {
        match self {
            Self::Created(n) | Self::Existing(n) => n,
        }
    }

    /// Consume and return the stored notification.
    pub fn into_notification(self) -> Notification {
        match self {
            Self::Created(n) | Self::Existing(n) => n,
        }
    }

    /// Whether this call stored a new row.
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}
