//! Payment status state machine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of a shared-cost payment.
///
/// ```text
/// pending ──► paid
///    │  ╲
///    │   ╲──► cancelled
///    ▼         ▲
/// overdue ─────┘
///    │
///    └──────► paid
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Waiting for the payer.
    Pending,
    /// Settled.
    Paid,
    /// Pending past its due date.
    Overdue,
    /// Withdrawn.
    Cancelled,
}

impl PaymentStatus {
    /// Paid and cancelled payments never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid | Self::Cancelled)
    }

    /// Whether `self -> next` is an allowed transition.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Paid)
                | (Self::Pending, Self::Overdue)
                | (Self::Pending, Self::Cancelled)
                | (Self::Overdue, Self::Paid)
                | (Self::Overdue, Self::Cancelled)
        )
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "overdue" => Ok(Self::Overdue),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("Unknown payment status: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states_have_no_exits() {
        for next in [
            PaymentStatus::Pending,
            PaymentStatus::Paid,
            PaymentStatus::Overdue,
            PaymentStatus::Cancelled,
        ] {
            assert!(!PaymentStatus::Paid.can_transition_to(next));
            assert!(!PaymentStatus::Cancelled.can_transition_to(next));
        }
    }

    #[test]
    fn test_overdue_can_still_be_paid() {
        assert!(PaymentStatus::Overdue.can_transition_to(PaymentStatus::Paid));
        assert!(!PaymentStatus::Overdue.can_transition_to(PaymentStatus::Pending));
    }
}
