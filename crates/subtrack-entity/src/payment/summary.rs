//! Group payment summary.

use serde::{Deserialize, Serialize};

use super::model::Payment;
use super::status::PaymentStatus;

/// Totals and counts per status over a set of payments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentSummary {
    /// Sum of all non-cancelled payments.
    pub total_expected: f64,
    pub total_paid: f64,
    pub total_pending: f64,
    pub total_overdue: f64,
    pub total_cancelled: f64,
    pub paid_count: u64,
    pub pending_count: u64,
    pub overdue_count: u64,
    pub cancelled_count: u64,
    pub payments: Vec<Payment>,
}

impl PaymentSummary {
    /// Aggregate a list of payments.
    pub fn from_payments(payments: Vec<Payment>) -> Self {
        let mut summary = Self::default();
        for payment in &payments {
            match payment.status {
                PaymentStatus::Paid => {
                    summary.total_paid += payment.amount;
                    summary.paid_count += 1;
                }
                PaymentStatus::Pending => {
                    summary.total_pending += payment.amount;
                    summary.pending_count += 1;
                }
                PaymentStatus::Overdue => {
                    summary.total_overdue += payment.amount;
                    summary.overdue_count += 1;
                }
                PaymentStatus::Cancelled => {
                    summary.total_cancelled += payment.amount;
                    summary.cancelled_count += 1;
                }
            }
        }
        summary.total_expected = summary.total_paid + summary.total_pending + summary.total_overdue;
        summary.payments = payments;
        summary
    }
}
