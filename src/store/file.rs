//! File-based task store — persists tasks as JSON files.
//!
//! Each task is written as a separate JSON file in a directory, which keeps
//! records inspectable with ordinary tools and survives process restarts.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::TaskStore;
use crate::error::StoreError;
use crate::types::Task;

/// File-based task store that persists tasks as individual JSON files.
///
/// Each task is saved as `{escaped_task_id}.json`. Writes go to a temporary
/// file first and are renamed into place, so a reader never observes a
/// half-written record.
#[derive(Debug, Clone)]
pub struct FileTaskStore {
    /// Directory where task JSON files are stored.
    tasks_dir: PathBuf,
    /// Read cache, task_id -> Task.
    cache: Arc<RwLock<HashMap<String, Task>>>,
}

impl FileTaskStore {
    /// Open (or create) a file-based task store rooted at `tasks_dir`.
    ///
    /// Existing `*.json` records are loaded into the cache; unreadable files
    /// are skipped with a warning.
    ///
    /// # Example
    /// ```no_run
    /// use a2a_tasks::store::FileTaskStore;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let store = FileTaskStore::open("./tasks").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn open(tasks_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let tasks_dir = tasks_dir.into();
        fs::create_dir_all(&tasks_dir).await?;

        let store = Self {
            tasks_dir,
            cache: Arc::new(RwLock::new(HashMap::new())),
        };
        store.load_from_disk().await?;
        Ok(store)
    }

    /// Directory holding the task files.
    pub fn dir(&self) -> &Path {
        &self.tasks_dir
    }

    fn task_file_path(&self, task_id: &str) -> PathBuf {
        self.tasks_dir.join(format!("{}.json", escape_file_stem(task_id)))
    }

    async fn load_from_disk(&self) -> Result<(), StoreError> {
        let mut entries = fs::read_dir(&self.tasks_dir).await?;
        let mut cache = self.cache.write().await;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if is_temp_file(&path) {
                // Left behind by a save interrupted before its rename.
                match fs::remove_file(&path).await {
                    Ok(()) => debug!(path = ?path, "Removed stale temp file"),
                    Err(e) => warn!(path = ?path, error = %e, "Failed to remove stale temp file"),
                }
                continue;
            }
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }

            match fs::read(&path).await {
                Ok(contents) => match serde_json::from_slice::<Task>(&contents) {
                    Ok(task) => {
                        cache.insert(task.id.clone(), task);
                    }
                    Err(e) => {
                        warn!(path = ?path, error = %e, "Failed to parse task JSON file");
                    }
                },
                Err(e) => {
                    warn!(path = ?path, error = %e, "Failed to read task file");
                }
            }
        }

        debug!(count = cache.len(), "Loaded tasks from disk");
        Ok(())
    }
}

#[async_trait]
impl TaskStore for FileTaskStore {
    async fn save(&self, task: &Task) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(task)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let path = self.task_file_path(&task.id);
        let tmp = self
            .tasks_dir
            .join(format!(".{}.tmp", uuid::Uuid::new_v4()));
        if let Err(e) = fs::write(&tmp, json).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        // Rename and cache update happen together so disk and cache agree on
        // which write for an id came last.
        let mut cache = self.cache.write().await;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        cache.insert(task.id.clone(), task.clone());

        debug!(task_id = %task.id, path = ?path, version = task.version, "Task written to disk");
        Ok(())
    }

    async fn find_by_id(&self, task_id: &str) -> Result<Option<Task>, StoreError> {
        let task = self.cache.read().await.get(task_id).cloned();
        debug!(task_id = %task_id, found = task.is_some(), "Task lookup");
        Ok(task)
    }
}

fn is_temp_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.') && name.ends_with(".tmp"))
}

/// Escape a task id into a filename stem. Injective: `%` itself is escaped.
fn escape_file_stem(task_id: &str) -> String {
    let mut out = String::with_capacity(task_id.len());
    for b in task_id.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' => out.push(b as char),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escaping_keeps_ids_inside_the_directory() {
        assert_eq!(escape_file_stem("t-1"), "t-1");
        assert_eq!(escape_file_stem("../etc/passwd"), "%2E%2E%2Fetc%2Fpasswd");
        assert_ne!(escape_file_stem("a/b"), escape_file_stem("a%2Fb"));
    }
}
