//! 内存断点存储（进程退出即丢失）

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::checkpoint::{CheckpointStore, ConflictPolicy};
use crate::core::CheckpointError;

/// 以 ID 为键的内存表，每个实例一把锁
#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    policy: ConflictPolicy,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: ConflictPolicy) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            policy,
        }
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn save(&self, id: &str, state: Vec<u8>) -> Result<(), CheckpointError> {
        let mut entries = self.entries.lock().await;
        if self.policy == ConflictPolicy::Reject && entries.contains_key(id) {
            return Err(CheckpointError::Conflict(id.to_string()));
        }
        entries.insert(id.to_string(), state);
        tracing::debug!(checkpoint_id = id, "checkpoint saved");
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Option<Vec<u8>>, CheckpointError> {
        Ok(self.entries.lock().await.get(id).cloned())
    }

    async fn delete(&self, id: &str) -> Result<(), CheckpointError> {
        if self.entries.lock().await.remove(id).is_some() {
            tracing::debug!(checkpoint_id = id, "checkpoint deleted");
        }
        Ok(())
    }
}
