//! Task store — pluggable persistence for client-side task records.
//!
//! The task engine only relies on the [`TaskStore`] trait. Two reference
//! backends are provided for development and tests:
//!
//! - [`InMemoryTaskStore`] — `HashMap` behind a tokio `RwLock` (lost on exit)
//! - [`FileTaskStore`] — one JSON file per task in a directory

mod file;
mod memory;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::types::Task;

pub use file::FileTaskStore;
pub use memory::InMemoryTaskStore;

/// Trait for persisting and retrieving client-side task records.
///
/// Implementations must be `Send + Sync`. `save` must be safe to call
/// concurrently for different task ids, and the latest `save` for an id must
/// be visible to a later `find_by_id` for the same id.
///
/// The engine never assumes a failed call was retried by the backend: every
/// error surfaces to the caller as [`A2AError::StoreFailure`].
///
/// [`A2AError::StoreFailure`]: crate::error::A2AError::StoreFailure
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert or replace the record for `task.id`.
    async fn save(&self, task: &Task) -> Result<(), StoreError>;

    /// Fetch the record for `task_id`, or `None` if there is none.
    async fn find_by_id(&self, task_id: &str) -> Result<Option<Task>, StoreError>;
}
