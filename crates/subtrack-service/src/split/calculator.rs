//! Share computation and split-configuration validation.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use subtrack_core::error::AppError;
use subtrack_core::types::id::{SubscriptionId, UserId};
use subtrack_entity::group::{SharingGroup, SplitConfig};

/// Tolerance on the percentage total.
const PERCENT_TOLERANCE: f64 = 0.01;

/// The amount one member owes for a billing period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberShare {
    pub user_id: UserId,
    pub amount: f64,
}

/// Pure share arithmetic over a loaded group.
#[derive(Debug, Clone, Copy, Default)]
pub struct SplitCalculator;

impl SplitCalculator {
    /// The amount `user_id` owes for one period of `subscription_id` at `price`.
    ///
    /// Inactive members and strangers owe nothing. A subscription that is not
    /// configured on the group is split equally.
    pub fn compute_share(
        &self,
        group: &SharingGroup,
        subscription_id: SubscriptionId,
        price: f64,
        user_id: UserId,
    ) -> f64 {
        if !group.is_active_member(user_id) {
            return 0.0;
        }

        let split = group.shared(subscription_id).map(|s| &s.split);

        match split {
            None | Some(SplitConfig::Equal) => {
                let active = group.active_members().count();
                if active == 0 {
                    0.0
                } else {
                    price / active as f64
                }
            }
            Some(SplitConfig::Custom(entries)) => entries
                .iter()
                .find(|e| e.user_id == user_id)
                .map(|e| e.amount)
                .unwrap_or(0.0),
            Some(SplitConfig::Percentage(entries)) => entries
                .iter()
                .find(|e| e.user_id == user_id)
                .map(|e| price * e.percentage / 100.0)
                .unwrap_or(0.0),
        }
    }

    /// Shares of every active member, in join order.
    pub fn allocate(
        &self,
        group: &SharingGroup,
        subscription_id: SubscriptionId,
        price: f64,
    ) -> Vec<MemberShare> {
        group
            .active_members()
            .map(|m| MemberShare {
                user_id: m.user_id,
                amount: self.compute_share(group, subscription_id, price, m.user_id),
            })
            .collect()
    }

    /// Check a split configuration against the group before it is stored.
    pub fn validate(&self, group: &SharingGroup, config: &SplitConfig) -> Result<(), AppError> {
        match config {
            SplitConfig::Equal => return Ok(()),
            SplitConfig::Custom(entries) => {
                for entry in entries {
                    if !entry.amount.is_finite() || entry.amount < 0.0 {
                        return Err(AppError::validation(format!(
                            "Custom amount for {} must be a non-negative number",
                            entry.user_id
                        )));
                    }
                }
            }
            SplitConfig::Percentage(entries) => {
                for entry in entries {
                    if !entry.percentage.is_finite()
                        || !(0.0..=100.0).contains(&entry.percentage)
                    {
                        return Err(AppError::validation(format!(
                            "Percentage for {} must be between 0 and 100",
                            entry.user_id
                        )));
                    }
                }
                let total: f64 = entries.iter().map(|e| e.percentage).sum();
                if (total - 100.0).abs() > PERCENT_TOLERANCE {
                    return Err(AppError::validation(format!(
                        "Percentages must sum to 100, got {total:.2}"
                    )));
                }
            }
        }

        let mut seen = HashSet::new();
        for user_id in config.listed_users() {
            if !group.is_active_member(user_id) {
                return Err(AppError::validation(format!(
                    "User {user_id} is not an active member of the group"
                )));
            }
            if !seen.insert(user_id) {
                return Err(AppError::validation(format!(
                    "User {user_id} is listed more than once"
                )));
            }
        }

        Ok(())
    }
}
