//! Sharing group repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

use subtrack_core::error::{AppError, ErrorKind};
use subtrack_core::result::AppResult;
use subtrack_core::types::id::{GroupId, SubscriptionId, UserId};
use subtrack_entity::group::{GroupMember, SharedSubscription, SharingGroup, SplitConfig};

use crate::store::GroupStore;

#[derive(Debug, FromRow)]
struct GroupRow {
    id: GroupId,
    owner_id: UserId,
    name: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct SharedRow {
    subscription_id: SubscriptionId,
    split: Json<SplitConfig>,
}

/// PostgreSQL sharing group store.
#[derive(Debug, Clone)]
pub struct GroupRepository {
    pool: PgPool,
}

impl GroupRepository {
    /// Create a new group repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GroupStore for GroupRepository {
    async fn find_by_id(&self, id: GroupId) -> AppResult<Option<SharingGroup>> {
        let Some(row) =
            sqlx::query_as::<_, GroupRow>("SELECT * FROM sharing_groups WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find group", e))?
        else {
            return Ok(None);
        };

        let members = sqlx::query_as::<_, GroupMember>(
            "SELECT user_id, role, joined_at, active FROM group_members \
             WHERE group_id = $1 ORDER BY joined_at, user_id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load group members", e))?;

        let shared = sqlx::query_as::<_, SharedRow>(
            "SELECT subscription_id, split FROM group_subscriptions WHERE group_id = $1",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to load shared subscriptions", e)
        })?;

        Ok(Some(SharingGroup {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            members,
            subscriptions: shared
                .into_iter()
                .map(|s| SharedSubscription {
                    subscription_id: s.subscription_id,
                    split: s.split.0,
                })
                .collect(),
            created_at: row.created_at,
        }))
    }

    async fn insert(&self, group: SharingGroup) -> AppResult<SharingGroup> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        sqlx::query("INSERT INTO sharing_groups (id, owner_id, name, created_at) VALUES ($1, $2, $3, $4)")
            .bind(group.id)
            .bind(group.owner_id)
            .bind(&group.name)
            .bind(group.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert group", e))?;

        for member in &group.members {
            sqlx::query(
                "INSERT INTO group_members (group_id, user_id, role, joined_at, active) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(group.id)
            .bind(member.user_id)
            .bind(member.role)
            .bind(member.joined_at)
            .bind(member.active)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert member", e))?;
        }

        for shared in &group.subscriptions {
            sqlx::query(
                "INSERT INTO group_subscriptions (group_id, subscription_id, split) VALUES ($1, $2, $3)",
            )
            .bind(group.id)
            .bind(shared.subscription_id)
            .bind(Json(&shared.split))
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to insert shared subscription", e)
            })?;
        }

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit transaction", e)
        })?;
        Ok(group)
    }

    async fn add_member(&self, group_id: GroupId, member: GroupMember) -> AppResult<()> {
        let result = sqlx::query(
            "INSERT INTO group_members (group_id, user_id, role, joined_at, active) \
             VALUES ($1, $2, $3, $4, $5) ON CONFLICT (group_id, user_id) DO NOTHING",
        )
        .bind(group_id)
        .bind(member.user_id)
        .bind(member.role)
        .bind(member.joined_at)
        .bind(member.active)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to add member", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::conflict(format!(
                "User {} is already a member of group {group_id}",
                member.user_id
            )));
        }
        Ok(())
    }

    async fn set_member_active(
        &self,
        group_id: GroupId,
        user_id: UserId,
        active: bool,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE group_members SET active = $3 WHERE group_id = $1 AND user_id = $2",
        )
        .bind(group_id)
        .bind(user_id)
        .bind(active)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update member", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn upsert_split(
        &self,
        group_id: GroupId,
        subscription_id: SubscriptionId,
        split: SplitConfig,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO group_subscriptions (group_id, subscription_id, split) VALUES ($1, $2, $3) \
             ON CONFLICT (group_id, subscription_id) DO UPDATE SET split = EXCLUDED.split",
        )
        .bind(group_id)
        .bind(subscription_id)
        .bind(Json(&split))
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to store split", e))?;
        Ok(())
    }
}
