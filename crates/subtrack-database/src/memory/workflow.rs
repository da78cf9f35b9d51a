//! In-memory workflow store.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use subtrack_core::AppError;
use subtrack_core::result::AppResult;
use subtrack_core::types::id::SubscriptionId;
use subtrack_entity::workflow::ReminderWorkflow;

use crate::store::WorkflowStore;

#[derive(Debug, Default)]
pub struct MemoryWorkflowStore {
    rows: DashMap<SubscriptionId, ReminderWorkflow>,
}

impl MemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn conflict(subscription_id: SubscriptionId) -> AppError {
    AppError::conflict(format!(
        "Workflow for subscription {subscription_id} was modified concurrently"
    ))
}

#[async_trait]
impl WorkflowStore for MemoryWorkflowStore {
    async fn get(&self, subscription_id: SubscriptionId) -> AppResult<Option<ReminderWorkflow>> {
        Ok(self.rows.get(&subscription_id).map(|w| w.clone()))
    }

    async fn compare_and_set(
        &self,
        mut next: ReminderWorkflow,
        expected_version: i64,
    ) -> AppResult<ReminderWorkflow> {
        let id = next.subscription_id;
        next.version = expected_version + 1;
        match self.rows.entry(id) {
            Entry::Vacant(slot) if expected_version == 0 => {
                slot.insert(next.clone());
                Ok(next)
            }
            Entry::Occupied(mut slot) if slot.get().version == expected_version => {
                slot.insert(next.clone());
                Ok(next)
            }
            _ => Err(conflict(id)),
        }
    }
}
