//! Request DTOs with validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use subtrack_core::types::id::{GroupId, NotificationId, SubscriptionId, UserId};
use subtrack_entity::group::GroupRole;
use subtrack_entity::notification::{EventFacts, NotificationFilter, NotificationKind, NotificationPriority};
use subtrack_entity::payment::{CreatePayment, PaymentStatus};
use subtrack_entity::subscription::{BillingFrequency, SubscriptionDraft, SubscriptionStatus};
use subtrack_service::payment::AllocatePeriod;

/// Create a notification for the caller from event facts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNotificationRequest {
    /// Subscription the event concerns, if any.
    #[serde(default)]
    pub subscription_id: Option<SubscriptionId>,
    /// The event.
    pub facts: EventFacts,
}

/// Filters accepted by the notification list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationFilterQuery {
    pub read: Option<bool>,
    pub kind: Option<NotificationKind>,
    pub priority: Option<NotificationPriority>,
}

impl From<NotificationFilterQuery> for NotificationFilter {
    fn from(query: NotificationFilterQuery) -> Self {
        Self {
            read: query.read,
            kind: query.kind,
            priority: query.priority,
        }
    }
}

/// A batch of notification ids.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NotificationIdsRequest {
    #[validate(length(min = 1, max = 500, message = "Between 1 and 500 ids are required"))]
    pub ids: Vec<NotificationId>,
}

/// Record a single shared payment.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreatePaymentRequest {
    pub group_id: GroupId,
    pub subscription_id: SubscriptionId,
    pub payer_id: UserId,
    #[validate(range(min = 0.0, message = "Amount must not be negative"))]
    pub amount: f64,
    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub currency: String,
    pub due_date: DateTime<Utc>,
    #[validate(length(max = 1000))]
    #[serde(default)]
    pub notes: Option<String>,
}

impl From<CreatePaymentRequest> for CreatePayment {
    fn from(req: CreatePaymentRequest) -> Self {
        Self {
            group_id: req.group_id,
            subscription_id: req.subscription_id,
            payer_id: req.payer_id,
            amount: req.amount,
            currency: req.currency,
            due_date: req.due_date,
            notes: req.notes,
        }
    }
}

/// Create one billing period's payments for every active member.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AllocatePeriodRequest {
    pub group_id: GroupId,
    pub subscription_id: SubscriptionId,
    #[validate(range(min = 0.0, message = "Price must not be negative"))]
    pub price: f64,
    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub currency: String,
    pub due_date: DateTime<Utc>,
}

impl From<AllocatePeriodRequest> for AllocatePeriod {
    fn from(req: AllocatePeriodRequest) -> Self {
        Self {
            group_id: req.group_id,
            subscription_id: req.subscription_id,
            price: req.price,
            currency: req.currency,
            due_date: req.due_date,
        }
    }
}

/// Settle a payment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct MarkPaidRequest {
    #[validate(length(min = 1, max = 100))]
    #[serde(default)]
    pub payment_method: Option<String>,
}

/// Explicit payment status change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePaymentStatusRequest {
    pub status: PaymentStatus,
}

/// Date range of a group summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryQuery {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Create a sharing group owned by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateGroupRequest {
    #[validate(length(min = 1, max = 100, message = "Group name is required"))]
    pub name: String,
}

/// Add a member to a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: UserId,
    #[serde(default = "default_role")]
    pub role: GroupRole,
}

fn default_role() -> GroupRole {
    GroupRole::Member
}

/// Start tracking a subscription for the caller.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TrackSubscriptionRequest {
    #[validate(length(min = 1, max = 200, message = "Subscription name is required"))]
    pub name: String,
    #[validate(range(min = 0.0, message = "Price must not be negative"))]
    pub price: f64,
    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub currency: String,
    pub frequency: BillingFrequency,
    pub start_date: DateTime<Utc>,
    #[serde(default)]
    pub renewal_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub trial_end_date: Option<DateTime<Utc>>,
    #[serde(default = "default_status")]
    pub status: SubscriptionStatus,
}

fn default_status() -> SubscriptionStatus {
    SubscriptionStatus::Active
}

impl TrackSubscriptionRequest {
    /// Draft owned by `user_id`.
    pub fn into_draft(self, user_id: UserId) -> SubscriptionDraft {
        SubscriptionDraft {
            user_id,
            name: self.name,
            price: self.price,
            currency: self.currency,
            frequency: self.frequency,
            start_date: self.start_date,
            renewal_date: self.renewal_date,
            trial_end_date: self.trial_end_date,
            status: self.status,
        }
    }
}

/// New state of a tracked subscription.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateSubscriptionRequest {
    #[validate(length(min = 1, max = 200, message = "Subscription name is required"))]
    pub name: String,
    #[validate(range(min = 0.0, message = "Price must not be negative"))]
    pub price: f64,
    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub currency: String,
    pub frequency: BillingFrequency,
    pub renewal_date: DateTime<Utc>,
    #[serde(default)]
    pub trial_end_date: Option<DateTime<Utc>>,
    pub status: SubscriptionStatus,
}
