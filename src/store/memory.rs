//! In-memory task store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::TaskStore;
use crate::error::StoreError;
use crate::types::Task;

/// In-memory task store backed by a `HashMap`.
///
/// Suitable for development, testing, and short-lived processes.
/// Cloning shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskStore {
    tasks: Arc<RwLock<HashMap<String, Task>>>,
}

impl InMemoryTaskStore {
    /// Create a new empty in-memory task store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tasks.
    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    /// Whether the store holds no tasks.
    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn save(&self, task: &Task) -> Result<(), StoreError> {
        let mut tasks = self.tasks.write().await;
        let is_new = tasks.insert(task.id.clone(), task.clone()).is_none();
        debug!(task_id = %task.id, is_new, version = task.version, "Task saved");
        Ok(())
    }

    async fn find_by_id(&self, task_id: &str) -> Result<Option<Task>, StoreError> {
        let task = self.tasks.read().await.get(task_id).cloned();
        debug!(task_id = %task_id, found = task.is_some(), "Task lookup");
        Ok(task)
    }
}
