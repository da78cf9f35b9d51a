//! Maps provider payment events onto payments and notifications.
//!
//! Signature verification happens upstream; events arrive here already
//! authenticated.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use subtrack_core::error::{AppError, ErrorKind};
use subtrack_core::types::id::{PaymentId, SubscriptionId};
use subtrack_database::{PaymentStore, SubscriptionStore};
use subtrack_entity::notification::{EventFacts, Generated};
use subtrack_entity::payment::Payment;

use crate::notification::NotificationGenerator;
use crate::payment::PaymentTracker;

/// A payment event delivered by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentWebhookEvent {
    PaymentSucceeded {
        subscription_id: SubscriptionId,
        #[serde(default)]
        payment_id: Option<PaymentId>,
        amount: f64,
        currency: String,
        #[serde(default)]
        payment_method: Option<String>,
    },
    PaymentFailed {
        subscription_id: SubscriptionId,
        #[serde(default)]
        payment_id: Option<PaymentId>,
        amount: f64,
        currency: String,
        #[serde(default)]
        reason: Option<String>,
    },
}

impl PaymentWebhookEvent {
    pub fn subscription_id(&self) -> SubscriptionId {
        match self {
            Self::PaymentSucceeded {
                subscription_id, ..
            }
            | Self::PaymentFailed {
                subscription_id, ..
            } => *subscription_id,
        }
    }
}

/// What an event resulted in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum WebhookOutcome {
    /// A tracked payment was marked paid (its payer was notified).
    PaymentSettled { payment_id: PaymentId },
    /// The tracked payment was already settled; nothing changed.
    AlreadySettled { payment_id: PaymentId },
    /// A notification was produced for the subscription owner or payer.
    Notified { notification: Generated },
}

/// Handles provider payment webhooks.
#[derive(Clone)]
pub struct WebhookService {
    subscriptions: Arc<dyn SubscriptionStore>,
    payments: Arc<dyn PaymentStore>,
    tracker: Arc<PaymentTracker>,
    generator: Arc<NotificationGenerator>,
}

impl std::fmt::Debug for WebhookService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookService").finish_non_exhaustive()
    }
}

impl WebhookService {
    /// Creates a new webhook service.
    pub fn new(
        subscriptions: Arc<dyn SubscriptionStore>,
        payments: Arc<dyn PaymentStore>,
        tracker: Arc<PaymentTracker>,
        generator: Arc<NotificationGenerator>,
    ) -> Self {
        Self {
            subscriptions,
            payments,
            tracker,
            generator,
        }
    }

    /// Apply one provider event.
    pub async fn handle(
        &self,
        event: PaymentWebhookEvent,
        now: DateTime<Utc>,
    ) -> Result<WebhookOutcome, AppError> {
        let subscription_id = event.subscription_id();
        let subscription = self
            .subscriptions
            .find_by_id(subscription_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Subscription {subscription_id} not found"))
            })?;

        match event {
            PaymentWebhookEvent::PaymentSucceeded {
                payment_id,
                amount,
                currency,
                payment_method,
                ..
            } => {
                if let Some(payment_id) = payment_id {
                    if self.payment_for(subscription_id, payment_id).await?.is_none() {
                        return Err(AppError::not_found(format!(
                            "Payment {payment_id} not found"
                        )));
                    }
                    return match self.tracker.mark_paid(payment_id, payment_method, now).await {
                        Ok(_) => {
                            info!(payment_id = %payment_id, "Webhook settled payment");
                            Ok(WebhookOutcome::PaymentSettled { payment_id })
                        }
                        Err(e) if e.kind == ErrorKind::Conflict => {
                            info!(payment_id = %payment_id, "Webhook for settled payment ignored");
                            Ok(WebhookOutcome::AlreadySettled { payment_id })
                        }
                        Err(e) => Err(e),
                    };
                }

                let facts = EventFacts::PaymentSuccess {
                    subscription_name: subscription.name.clone(),
                    amount,
                    currency,
                    payment_id: None,
                };
                let notification = self
                    .generator
                    .generate(subscription.user_id, Some(subscription.id), &facts, now)
                    .await?;
                Ok(WebhookOutcome::Notified { notification })
            }
            PaymentWebhookEvent::PaymentFailed {
                payment_id,
                amount,
                currency,
                reason,
                ..
            } => {
                let recipient = match payment_id {
                    Some(id) => match self.payment_for(subscription_id, id).await? {
                        Some(payment) => payment.payer_id,
                        None => {
                            warn!(payment_id = %id, "Failed-payment webhook for unknown payment");
                            subscription.user_id
                        }
                    },
                    None => subscription.user_id,
                };

                let facts = EventFacts::PaymentFailed {
                    subscription_name: subscription.name.clone(),
                    amount,
                    currency,
                    payment_id,
                    reason,
                };
                let notification = self
                    .generator
                    .generate(recipient, Some(subscription.id), &facts, now)
                    .await?;
                info!(
                    subscription_id = %subscription.id,
                    recipient = %recipient,
                    "Payment failure recorded"
                );
                Ok(WebhookOutcome::Notified { notification })
            }
        }
    }

    /// Looks up a payment named by an event. A payment that belongs to a
    /// different subscription is rejected.
    async fn payment_for(
        &self,
        subscription_id: SubscriptionId,
        payment_id: PaymentId,
    ) -> Result<Option<Payment>, AppError> {
        let Some(payment) = self.payments.find_by_id(payment_id).await? else {
            return Ok(None);
        };
        if payment.subscription_id != subscription_id {
            warn!(
                payment_id = %payment_id,
                event_subscription = %subscription_id,
                payment_subscription = %payment.subscription_id,
                "Webhook payment belongs to another subscription"
            );
            return Err(AppError::validation(format!(
                "Payment {payment_id} does not belong to subscription {subscription_id}"
            )));
        }
        Ok(Some(payment))
    }
}
