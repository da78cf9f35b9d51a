//! Cost-split configuration for a shared subscription.

use serde::{Deserialize, Serialize};
use std::fmt;
use subtrack_core::types::id::UserId;

/// How a shared subscription's cost is divided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitType {
    Equal,
    Custom,
    Percentage,
}

impl fmt::Display for SplitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Equal => "equal",
            Self::Custom => "custom",
            Self::Percentage => "percentage",
        };
        f.write_str(s)
    }
}

/// A fixed amount owed by one member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmountShare {
    pub user_id: UserId,
    pub amount: f64,
}

/// A percentage of the price owed by one member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentShare {
    pub user_id: UserId,
    pub percentage: f64,
}

/// Split rule plus its entries.
///
/// Serialized as `{"split_type": "...", "entries": [...]}`; equal splits
/// carry no entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "split_type", content = "entries", rename_all = "lowercase")]
pub enum SplitConfig {
    #[default]
    Equal,
    Custom(Vec<AmountShare>),
    Percentage(Vec<PercentShare>),
}

impl SplitConfig {
    /// The rule without its entries.
    pub fn split_type(&self) -> SplitType {
        match self {
            Self::Equal => SplitType::Equal,
            Self::Custom(_) => SplitType::Custom,
            Self::Percentage(_) => SplitType::Percentage,
        }
    }

    /// Users listed in the entries, in order.
    pub fn listed_users(&self) -> Vec<UserId> {
        match self {
            Self::Equal => Vec::new(),
            Self::Custom(entries) => entries.iter().map(|e| e.user_id).collect(),
            Self::Percentage(entries) => entries.iter().map(|e| e.user_id).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_split_serializes_without_entries() {
        let json = serde_json::to_value(SplitConfig::Equal).unwrap();
        assert_eq!(json, serde_json::json!({ "split_type": "equal" }));
    }

    #[test]
    fn test_percentage_split_parses() {
        let user = UserId::new();
        let json = serde_json::json!({
            "split_type": "percentage",
            "entries": [{ "user_id": user, "percentage": 100.0 }]
        });
        let config: SplitConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.split_type(), SplitType::Percentage);
        assert_eq!(config.listed_users(), vec![user]);
    }
}
