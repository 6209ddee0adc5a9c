//! File-backed task store: persistence across reopen and use behind the client.

mod common;

use std::sync::Arc;

use a2a_tasks::store::{FileTaskStore, TaskStore};
use a2a_tasks::types::*;
use chrono::Utc;
use common::{client, summarizer_card, Reply, ScriptedTransport};
use serde_json::json;

fn task(id: &str, status: TaskState) -> Task {
    Task {
        id: id.to_string(),
        agent: AgentRef {
            endpoint: common::ENDPOINT.to_string(),
            auth_scheme: None,
        },
        action: "summarize".to_string(),
        params: json!({"text": "hello"}).as_object().cloned().unwrap_or_default(),
        status,
        result: None,
        error: None,
        version: 1,
        updated_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_save_and_reopen() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;

    let store = FileTaskStore::open(dir.path()).await?;
    store.save(&task("t-1", TaskState::Working)).await?;
    store.save(&task("t-2", TaskState::Submitted)).await?;
    drop(store);

    let reopened = FileTaskStore::open(dir.path()).await?;
    let found = reopened.find_by_id("t-1").await?.expect("t-1 persisted");
    assert_eq!(found.status, TaskState::Working);
    assert_eq!(found.params["text"], "hello");
    assert!(reopened.find_by_id("t-2").await?.is_some());
    assert!(reopened.find_by_id("t-3").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_overwrite_keeps_latest() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = FileTaskStore::open(dir.path()).await?;

    let mut record = task("t-1", TaskState::Working);
    store.save(&record).await?;
    record.status = TaskState::Completed;
    record.result = Some(json!({"summary": "done"}));
    record.version = 2;
    store.save(&record).await?;

    let reopened = FileTaskStore::open(dir.path()).await?;
    assert_eq!(reopened.find_by_id("t-1").await?, Some(record));

    let files: Vec<_> = std::fs::read_dir(dir.path())?
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(files, ["t-1.json"]);
    Ok(())
}

#[tokio::test]
async fn test_ids_with_path_characters_stay_in_directory() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = FileTaskStore::open(dir.path()).await?;

    store.save(&task("../escape", TaskState::Submitted)).await?;
    store.save(&task("a/b", TaskState::Submitted)).await?;

    assert!(!dir.path().parent().unwrap().join("escape.json").exists());
    let reopened = FileTaskStore::open(dir.path()).await?;
    assert!(reopened.find_by_id("../escape").await?.is_some());
    assert!(reopened.find_by_id("a/b").await?.is_some());
    Ok(())
}

#[tokio::test]
async fn test_corrupt_files_are_skipped() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join("broken.json"), "{not json")?;
    std::fs::write(dir.path().join("notes.txt"), "ignored")?;

    let store = FileTaskStore::open(dir.path()).await?;
    store.save(&task("t-1", TaskState::Submitted)).await?;
    assert!(store.find_by_id("t-1").await?.is_some());
    Ok(())
}

#[tokio::test]
async fn test_stale_temp_files_are_swept_on_open() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let stale = dir.path().join(".3f2a9c1e-interrupted.tmp");
    std::fs::write(&stale, "{\"id\": \"half")?;
    std::fs::write(dir.path().join("keep.tmp"), "not ours")?;

    let store = FileTaskStore::open(dir.path()).await?;
    store.save(&task("t-1", TaskState::Submitted)).await?;

    assert!(!stale.exists());
    let mut files: Vec<_> = std::fs::read_dir(dir.path())?
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    files.sort();
    assert_eq!(files, ["keep.tmp", "t-1.json"]);
    Ok(())
}

#[tokio::test]
async fn test_failed_save_leaves_no_temp_file() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = FileTaskStore::open(dir.path()).await?;
    // A directory where the task file should go makes the rename fail.
    std::fs::create_dir(dir.path().join("t-1.json"))?;

    assert!(store.save(&task("t-1", TaskState::Submitted)).await.is_err());
    assert!(store.find_by_id("t-1").await?.is_none());
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())?
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_client_persists_to_disk() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let transport = ScriptedTransport::new([
        Reply::snapshot("t-1", "submitted"),
        Reply::Result(json!({"id": "t-1", "status": "completed", "result": 42})),
    ]);
    let store = Arc::new(FileTaskStore::open(dir.path()).await?);
    let client = client(transport, store);

    let task = client
        .create_task(&summarizer_card(), "summarize", json!({}))
        .await?;
    client.get_task_status(&task).await?;

    let reopened = FileTaskStore::open(dir.path()).await?;
    let stored = reopened.find_by_id("t-1").await?.expect("persisted");
    assert_eq!(stored.status, TaskState::Completed);
    assert_eq!(stored.result, Some(json!(42)));
    Ok(())
}
