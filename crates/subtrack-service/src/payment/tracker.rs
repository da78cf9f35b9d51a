//! Payment lifecycle, overdue sweep and group summaries.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use subtrack_core::error::AppError;
use subtrack_core::types::id::{GroupId, PaymentId, SubscriptionId};
use subtrack_database::{GroupStore, PaymentStore, SubscriptionStore};
use subtrack_entity::group::SharingGroup;
use subtrack_entity::notification::EventFacts;
use subtrack_entity::payment::{CreatePayment, Payment, PaymentStatus, PaymentSummary};

use crate::notification::NotificationGenerator;
use crate::split::SplitCalculator;

/// Name used in notifications when the subscription row is gone.
const FALLBACK_SUBSCRIPTION_NAME: &str = "Shared subscription";

/// Input for creating one billing period's payments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocatePeriod {
    pub group_id: GroupId,
    pub subscription_id: SubscriptionId,
    pub price: f64,
    pub currency: String,
    pub due_date: DateTime<Utc>,
}

/// Tracks who owes what for shared subscriptions.
#[derive(Clone)]
pub struct PaymentTracker {
    payments: Arc<dyn PaymentStore>,
    groups: Arc<dyn GroupStore>,
    subscriptions: Arc<dyn SubscriptionStore>,
    generator: Arc<NotificationGenerator>,
    calculator: SplitCalculator,
}

impl std::fmt::Debug for PaymentTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentTracker").finish_non_exhaustive()
    }
}

impl PaymentTracker {
    /// Creates a new payment tracker.
    pub fn new(
        payments: Arc<dyn PaymentStore>,
        groups: Arc<dyn GroupStore>,
        subscriptions: Arc<dyn SubscriptionStore>,
        generator: Arc<NotificationGenerator>,
    ) -> Self {
        Self {
            payments,
            groups,
            subscriptions,
            generator,
            calculator: SplitCalculator,
        }
    }

    /// Records a single pending payment.
    pub async fn create(&self, input: CreatePayment, now: DateTime<Utc>) -> Result<Payment, AppError> {
        validate_amount(input.amount)?;
        validate_currency(&input.currency)?;

        let group = self.load_group(input.group_id).await?;
        if !group.is_active_member(input.payer_id) {
            return Err(AppError::validation(format!(
                "User {} is not an active member of group {}",
                input.payer_id, input.group_id
            )));
        }
        require_shared(&group, input.subscription_id)?;

        let payment = self.payments.insert(input.into_payment(now)).await?;
        info!(
            payment_id = %payment.id,
            group_id = %payment.group_id,
            payer_id = %payment.payer_id,
            amount = payment.amount,
            "Payment created"
        );
        Ok(payment)
    }

    /// Creates one pending payment per active member for a billing period.
    /// Members whose share is zero get no row.
    pub async fn allocate_period(
        &self,
        input: AllocatePeriod,
        now: DateTime<Utc>,
    ) -> Result<Vec<Payment>, AppError> {
        validate_amount(input.price)?;
        validate_currency(&input.currency)?;

        let group = self.load_group(input.group_id).await?;
        require_shared(&group, input.subscription_id)?;

        let rows: Vec<Payment> = self
            .calculator
            .allocate(&group, input.subscription_id, input.price)
            .into_iter()
            .filter(|share| share.amount > 0.0)
            .map(|share| {
                CreatePayment {
                    group_id: input.group_id,
                    subscription_id: input.subscription_id,
                    payer_id: share.user_id,
                    amount: share.amount,
                    currency: input.currency.clone(),
                    due_date: input.due_date,
                    notes: None,
                }
                .into_payment(now)
            })
            .collect();

        if rows.is_empty() {
            return Ok(rows);
        }

        let created = self.payments.insert_many(rows).await?;
        info!(
            group_id = %input.group_id,
            subscription_id = %input.subscription_id,
            count = created.len(),
            "Billing period allocated"
        );
        Ok(created)
    }

    /// pending|overdue → paid, then tells the payer.
    pub async fn mark_paid(
        &self,
        id: PaymentId,
        method: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Payment, AppError> {
        let Some(payment) = self.payments.mark_paid(id, method, now).await? else {
            return Err(self.transition_refused(id).await);
        };
        info!(payment_id = %id, payer_id = %payment.payer_id, "Payment marked paid");

        let facts = EventFacts::PaymentSuccess {
            subscription_name: self.subscription_name(payment.subscription_id).await,
            amount: payment.amount,
            currency: payment.currency.clone(),
            payment_id: Some(payment.id),
        };
        self.notify(&payment, &facts, now).await?;
        Ok(payment)
    }

    /// Explicit status change validated by the payment state machine.
    ///
    /// Only `paid` and `cancelled` can be requested. Overdue is reached
    /// through [`Self::sweep_overdue`] once the due date has passed.
    pub async fn update_status(
        &self,
        id: PaymentId,
        next: PaymentStatus,
        now: DateTime<Utc>,
    ) -> Result<Payment, AppError> {
        match next {
            PaymentStatus::Paid => return self.mark_paid(id, None, now).await,
            PaymentStatus::Pending => {
                return Err(AppError::validation("A payment cannot return to pending"));
            }
            PaymentStatus::Overdue => {
                return Err(AppError::validation(
                    "Payments become overdue automatically after their due date",
                ));
            }
            PaymentStatus::Cancelled => {}
        }

        let current = self
            .payments
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Payment {id} not found")))?;
        if current.status.is_terminal() {
            return Err(AppError::conflict(format!(
                "Payment {id} is already {}",
                current.status
            )));
        }
        if !current.status.can_transition_to(next) {
            return Err(AppError::validation(format!(
                "Cannot move payment from {} to {next}",
                current.status
            )));
        }

        let updated = self
            .payments
            .set_status(id, current.status, next, now)
            .await?
            .ok_or_else(|| AppError::conflict(format!("Payment {id} changed concurrently")))?;
        info!(payment_id = %id, from = %current.status, to = %next, "Payment status changed");
        Ok(updated)
    }

    /// Moves every pending payment past its due date to overdue and
    /// notifies each payer. Returns the number of payments moved.
    ///
    /// A payment whose overdue notification cannot be stored goes back to
    /// pending so the next sweep retries it; the first such error is
    /// returned after the rest of the batch is processed.
    pub async fn sweep_overdue(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let changed = self.payments.mark_overdue(now).await?;
        let mut moved = 0u64;
        let mut first_error = None;

        for payment in &changed {
            let facts = self.overdue_facts(payment).await;
            match self.notify(payment, &facts, now).await {
                Ok(()) => moved += 1,
                Err(e) => {
                    self.revert_to_pending(payment, now).await;
                    first_error.get_or_insert(e);
                }
            }
        }

        if moved > 0 {
            info!(count = moved, "Overdue sweep moved payments");
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(moved),
        }
    }

    /// Totals for a group's payments due within `[start, end]`.
    pub async fn summarize(
        &self,
        group_id: GroupId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<PaymentSummary, AppError> {
        if start > end {
            return Err(AppError::validation("Summary start must not be after end"));
        }
        self.load_group(group_id).await?;
        let payments = self.payments.list_for_group(group_id, start, end).await?;
        Ok(PaymentSummary::from_payments(payments))
    }

    /// Sends the payer a payment-due reminder. Status is unchanged.
    pub async fn remind(&self, id: PaymentId, now: DateTime<Utc>) -> Result<Payment, AppError> {
        let Some(payment) = self.payments.record_reminder(id, now).await? else {
            return Err(self.transition_refused(id).await);
        };
        info!(
            payment_id = %id,
            reminders_sent = payment.reminders_sent,
            "Payment reminder sent"
        );

        let facts = EventFacts::PaymentDue {
            subscription_name: self.subscription_name(payment.subscription_id).await,
            amount: payment.amount,
            currency: payment.currency.clone(),
            payment_id: payment.id,
            group_id: payment.group_id,
            due_date: payment.due_date,
        };
        self.notify(&payment, &facts, now).await?;
        Ok(payment)
    }

    async fn load_group(&self, group_id: GroupId) -> Result<SharingGroup, AppError> {
        self.groups
            .find_by_id(group_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Group {group_id} not found")))
    }

    /// The error for a conditional update that matched nothing.
    async fn transition_refused(&self, id: PaymentId) -> AppError {
        match self.payments.find_by_id(id).await {
            Ok(Some(payment)) => {
                AppError::conflict(format!("Payment {id} is already {}", payment.status))
            }
            Ok(None) => AppError::not_found(format!("Payment {id} not found")),
            Err(e) => e,
        }
    }

    async fn subscription_name(&self, id: SubscriptionId) -> String {
        match self.subscriptions.find_by_id(id).await {
            Ok(Some(subscription)) => subscription.name,
            _ => FALLBACK_SUBSCRIPTION_NAME.to_string(),
        }
    }

    async fn overdue_facts(&self, payment: &Payment) -> EventFacts {
        EventFacts::PaymentOverdue {
            subscription_name: self.subscription_name(payment.subscription_id).await,
            amount: payment.amount,
            currency: payment.currency.clone(),
            payment_id: payment.id,
            group_id: payment.group_id,
            due_date: payment.due_date,
        }
    }

    /// Tell the payer. The payment change is already committed, so a
    /// failure is logged here and handed back to the caller.
    async fn notify(
        &self,
        payment: &Payment,
        facts: &EventFacts,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.generator
            .generate(payment.payer_id, Some(payment.subscription_id), facts, now)
            .await
            .map(|_| ())
            .map_err(|e| {
                error!(
                    payment_id = %payment.id,
                    kind = %facts.kind(),
                    error = %e,
                    "Failed to create payment notification"
                );
                e
            })
    }

    async fn revert_to_pending(&self, payment: &Payment, now: DateTime<Utc>) {
        match self
            .payments
            .set_status(payment.id, PaymentStatus::Overdue, PaymentStatus::Pending, now)
            .await
        {
            Ok(Some(_)) => {
                warn!(payment_id = %payment.id, "Overdue payment returned to pending for retry");
            }
            Ok(None) => {}
            Err(e) => error!(
                payment_id = %payment.id,
                error = %e,
                "Failed to return payment to pending; its overdue notice is lost"
            ),
        }
    }
}

fn validate_amount(amount: f64) -> Result<(), AppError> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(())
    } else {
        Err(AppError::validation("Amount must be a non-negative number"))
    }
}

fn validate_currency(currency: &str) -> Result<(), AppError> {
    if currency.trim().is_empty() {
        Err(AppError::validation("Currency is required"))
    } else {
        Ok(())
    }
}

fn require_shared(group: &SharingGroup, subscription_id: SubscriptionId) -> Result<(), AppError> {
    if group.shared(subscription_id).is_some() {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "Subscription {subscription_id} is not shared in group {}",
            group.id
        )))
    }
}
