//! In-memory sharing group store.

use async_trait::async_trait;
use dashmap::DashMap;

use subtrack_core::AppError;
use subtrack_core::result::AppResult;
use subtrack_core::types::id::{GroupId, SubscriptionId, UserId};
use subtrack_entity::group::{GroupMember, SharedSubscription, SharingGroup, SplitConfig};

use crate::store::GroupStore;

#[derive(Debug, Default)]
pub struct MemoryGroupStore {
    rows: DashMap<GroupId, SharingGroup>,
}

impl MemoryGroupStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn missing(group_id: GroupId) -> AppError {
    AppError::not_found(format!("Group {group_id} not found"))
}

#[async_trait]
impl GroupStore for MemoryGroupStore {
    async fn find_by_id(&self, id: GroupId) -> AppResult<Option<SharingGroup>> {
        Ok(self.rows.get(&id).map(|g| g.clone()))
    }

    async fn insert(&self, group: SharingGroup) -> AppResult<SharingGroup> {
        self.rows.insert(group.id, group.clone());
        Ok(group)
    }

    async fn add_member(&self, group_id: GroupId, member: GroupMember) -> AppResult<()> {
        let mut group = self.rows.get_mut(&group_id).ok_or_else(|| missing(group_id))?;
        if group.member(member.user_id).is_some() {
            return Err(AppError::conflict(format!(
                "User {} is already a member of group {group_id}",
                member.user_id
            )));
        }
        group.members.push(member);
        Ok(())
    }

    async fn set_member_active(
        &self,
        group_id: GroupId,
        user_id: UserId,
        active: bool,
    ) -> AppResult<bool> {
        let Some(mut group) = self.rows.get_mut(&group_id) else {
            return Ok(false);
        };
        match group.members.iter_mut().find(|m| m.user_id == user_id) {
            Some(member) => {
                member.active = active;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn upsert_split(
        &self,
        group_id: GroupId,
        subscription_id: SubscriptionId,
        split: SplitConfig,
    ) -> AppResult<()> {
        let mut group = self.rows.get_mut(&group_id).ok_or_else(|| missing(group_id))?;
        match group
            .subscriptions
            .iter_mut()
            .find(|s| s.subscription_id == subscription_id)
        {
            Some(shared) => shared.split = split,
            None => group.subscriptions.push(SharedSubscription {
                subscription_id,
                split,
            }),
        }
        Ok(())
    }
}
