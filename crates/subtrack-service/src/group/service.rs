//! Group membership and split configuration.

use std::sync::Arc;

use tracing::info;

use subtrack_core::error::AppError;
use subtrack_core::types::id::{GroupId, SubscriptionId, UserId};
use subtrack_database::GroupStore;
use subtrack_entity::group::{GroupMember, GroupRole, SharingGroup, SplitConfig};

use crate::context::RequestContext;
use crate::split::SplitCalculator;

/// Manages sharing groups.
#[derive(Clone)]
pub struct GroupService {
    /// Group store.
    groups: Arc<dyn GroupStore>,
    calculator: SplitCalculator,
}

impl std::fmt::Debug for GroupService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupService").finish_non_exhaustive()
    }
}

impl GroupService {
    /// Creates a new group service.
    pub fn new(groups: Arc<dyn GroupStore>) -> Self {
        Self {
            groups,
            calculator: SplitCalculator,
        }
    }

    /// Creates a group owned by the caller.
    pub async fn create_group(
        &self,
        ctx: &RequestContext,
        name: &str,
    ) -> Result<SharingGroup, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::validation("Group name is required"));
        }
        let group = self
            .groups
            .insert(SharingGroup::new(ctx.user_id, name, ctx.request_time))
            .await?;
        info!(group_id = %group.id, owner_id = %ctx.user_id, "Sharing group created");
        Ok(group)
    }

    /// Loads a group.
    pub async fn get(&self, group_id: GroupId) -> Result<SharingGroup, AppError> {
        self.groups
            .find_by_id(group_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Group {group_id} not found")))
    }

    /// Stores the split rule of a shared subscription.
    ///
    /// The caller must be an owner or admin of the group.
    pub async fn configure_split(
        &self,
        ctx: &RequestContext,
        group_id: GroupId,
        subscription_id: SubscriptionId,
        config: SplitConfig,
    ) -> Result<SharingGroup, AppError> {
        let group = self.get(group_id).await?;
        self.require_manager(ctx, &group)?;
        self.calculator.validate(&group, &config)?;

        let split_type = config.split_type();
        self.groups
            .upsert_split(group_id, subscription_id, config)
            .await?;

        info!(
            group_id = %group_id,
            subscription_id = %subscription_id,
            split_type = %split_type,
            actor = %ctx.user_id,
            "Split configured"
        );

        self.get(group_id).await
    }

    /// Adds a member to the group.
    pub async fn add_member(
        &self,
        ctx: &RequestContext,
        group_id: GroupId,
        user_id: UserId,
        role: GroupRole,
    ) -> Result<(), AppError> {
        let group = self.get(group_id).await?;
        self.require_manager(ctx, &group)?;
        if role == GroupRole::Owner {
            return Err(AppError::validation("A group has exactly one owner"));
        }

        self.groups
            .add_member(
                group_id,
                GroupMember {
                    user_id,
                    role,
                    joined_at: ctx.request_time,
                    active: true,
                },
            )
            .await?;
        info!(group_id = %group_id, user_id = %user_id, role = ?role, "Member added");
        Ok(())
    }

    /// Deactivates a member. Existing payments are left as they are.
    pub async fn remove_member(
        &self,
        ctx: &RequestContext,
        group_id: GroupId,
        user_id: UserId,
    ) -> Result<(), AppError> {
        let group = self.get(group_id).await?;
        if ctx.user_id != user_id {
            self.require_manager(ctx, &group)?;
        }
        if group.owner_id == user_id {
            return Err(AppError::validation("The group owner cannot be removed"));
        }

        if !self.groups.set_member_active(group_id, user_id, false).await? {
            return Err(AppError::not_found(format!(
                "User {user_id} is not a member of group {group_id}"
            )));
        }
        info!(group_id = %group_id, user_id = %user_id, "Member deactivated");
        Ok(())
    }

    fn require_manager(&self, ctx: &RequestContext, group: &SharingGroup) -> Result<(), AppError> {
        if ctx.is_admin || group.can_manage(ctx.user_id) {
            Ok(())
        } else {
            Err(AppError::authorization(
                "Only group owners and admins can change the group",
            ))
        }
    }
}
