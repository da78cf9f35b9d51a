//! Sharing group aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use subtrack_core::types::id::{GroupId, SubscriptionId, UserId};

use super::role::GroupRole;
use super::split::SplitConfig;

/// A member of a sharing group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct GroupMember {
    pub user_id: UserId,
    pub role: GroupRole,
    pub joined_at: DateTime<Utc>,
    /// Inactive members keep their history but owe nothing going forward.
    pub active: bool,
}

/// A subscription whose cost is shared within a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedSubscription {
    pub subscription_id: SubscriptionId,
    pub split: SplitConfig,
}

/// A group of users sharing subscription costs.
///
/// Loaded as an aggregate: members are kept in join order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharingGroup {
    pub id: GroupId,
    pub owner_id: UserId,
    pub name: String,
    pub members: Vec<GroupMember>,
    pub subscriptions: Vec<SharedSubscription>,
    pub created_at: DateTime<Utc>,
}

impl SharingGroup {
    /// Create a group whose only member is the owner.
    pub fn new(owner_id: UserId, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: GroupId::new(),
            owner_id,
            name: name.into(),
            members: vec![GroupMember {
                user_id: owner_id,
                role: GroupRole::Owner,
                joined_at: now,
                active: true,
            }],
            subscriptions: Vec::new(),
            created_at: now,
        }
    }

    /// Look up a member (active or not).
    pub fn member(&self, user_id: UserId) -> Option<&GroupMember> {
        self.members.iter().find(|m| m.user_id == user_id)
    }

    /// Whether the user is an active member.
    pub fn is_active_member(&self, user_id: UserId) -> bool {
        self.member(user_id).is_some_and(|m| m.active)
    }

    /// Active members in join order.
    pub fn active_members(&self) -> impl Iterator<Item = &GroupMember> {
        self.members.iter().filter(|m| m.active)
    }

    /// Whether the user may change group configuration.
    pub fn can_manage(&self, user_id: UserId) -> bool {
        self.member(user_id)
            .is_some_and(|m| m.active && m.role.can_manage())
    }

    /// The shared entry for a subscription, if it is shared in this group.
    pub fn shared(&self, subscription_id: SubscriptionId) -> Option<&SharedSubscription> {
        self.subscriptions
            .iter()
            .find(|s| s.subscription_id == subscription_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_can_manage_member_cannot() {
        let owner = UserId::new();
        let mut group = SharingGroup::new(owner, "Flat 4B", Utc::now());
        let member = UserId::new();
        group.members.push(GroupMember {
            user_id: member,
            role: GroupRole::Member,
            joined_at: Utc::now(),
            active: true,
        });
        assert!(group.can_manage(owner));
        assert!(!group.can_manage(member));
        assert!(!group.can_manage(UserId::new()));
    }
}
