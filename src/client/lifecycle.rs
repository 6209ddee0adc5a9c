//! Task lifecycle engine.
//!
//! Creates tasks on remote agents, polls their status and cancels them. Every
//! state change comes from a decoded remote response and is merged into the
//! local record under the monotonic ordering
//! `Submitted < Working < {Completed, Failed, Canceled}`: a report that would
//! move a task backwards is logged as a stale read and dropped.
//!
//! Concurrency model:
//! - network calls never run under a lock;
//! - the read-merge-persist step for one task id is serialized, so two racing
//!   polls of the same task persist the higher-ranked state regardless of
//!   completion order, while different ids never contend;
//! - each operation runs on its own spawned tokio task, so a caller dropping
//!   the returned future does not drop a response already in flight.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::OwnedMutexGuard;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{A2AError, A2AResult};
use crate::store::TaskStore;
use crate::types::{
    AgentCard, AgentRef, CreateTaskParams, Task, TaskError, TaskIdParams, TaskSnapshot, TaskState,
};

use super::codec::JsonRpcCodec;
use super::retry::RetryPolicy;
use super::transport::Transport;

/// JSON-RPC method creating a task.
pub const METHOD_TASKS_CREATE: &str = "tasks/create";
/// JSON-RPC method reading a task.
pub const METHOD_TASKS_GET: &str = "tasks/get";
/// JSON-RPC method canceling a task.
pub const METHOD_TASKS_CANCEL: &str = "tasks/cancel";

// ──────────────────────────────────────────────────
// Transition rule
// ──────────────────────────────────────────────────

/// Outcome of merging a remote report into a local task.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// The report moved the task forward.
    Advanced(Task),
    /// The report repeats the current state.
    Unchanged,
    /// The report would move the task backwards (or between terminal states).
    Stale {
        /// State kept.
        local: TaskState,
        /// State reported and ignored.
        reported: TaskState,
    },
}

/// Merge `snapshot` into `current` under the non-regression rule.
///
/// On advance, `result` is kept only for `Completed` and `error` only for
/// `Failed`, and the version is bumped.
pub fn apply_snapshot(current: &Task, snapshot: &TaskSnapshot) -> Transition {
    if snapshot.status == current.status {
        return Transition::Unchanged;
    }
    if !current.status.can_transition_to(snapshot.status) {
        return Transition::Stale {
            local: current.status,
            reported: snapshot.status,
        };
    }

    let mut next = current.clone();
    next.status = snapshot.status;
    next.result = match snapshot.status {
        TaskState::Completed => snapshot.result.clone(),
        _ => None,
    };
    next.error = match snapshot.status {
        TaskState::Failed => Some(snapshot.error.clone().unwrap_or_else(|| TaskError {
            code: None,
            message: "remote agent reported failure without detail".to_string(),
            data: None,
        })),
        _ => None,
    };
    next.version = current.version + 1;
    next.updated_at = Utc::now();
    Transition::Advanced(next)
}

/// Of two copies of the same task, the one further along.
fn further_along(a: Task, b: Task) -> Task {
    if (b.status.rank(), b.version) > (a.status.rank(), a.version) {
        b
    } else {
        a
    }
}

// ──────────────────────────────────────────────────
// Per-id locking
// ──────────────────────────────────────────────────

/// One async mutex per task id, dropped from the map when unused.
#[derive(Default)]
struct KeyedLocks {
    slots: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

struct KeyGuard<'a> {
    locks: &'a KeyedLocks,
    key: String,
    slot: Arc<tokio::sync::Mutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyedLocks {
    async fn lock(&self, key: &str) -> KeyGuard<'_> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.entry(key.to_string()).or_default().clone()
        };
        let guard = slot.clone().lock_owned().await;
        KeyGuard {
            locks: self,
            key: key.to_string(),
            slot,
            guard: Some(guard),
        }
    }
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut slots = self
            .locks
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Only the map and this guard still reference the slot.
        if Arc::strong_count(&self.slot) == 2 {
            slots.remove(&self.key);
        }
    }
}

// ──────────────────────────────────────────────────
// Polling cadence
// ──────────────────────────────────────────────────

/// Cadence for [`TaskEngine::wait_for_completion`].
#[derive(Debug, Clone, PartialEq)]
pub struct PollOptions {
    /// Delay after the first non-terminal poll.
    pub interval: Duration,
    /// Upper bound the delay doubles towards.
    pub max_interval: Duration,
    /// Polls made before giving up and returning the last known task.
    pub max_polls: u32,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(10),
            max_polls: 60,
        }
    }
}

// ──────────────────────────────────────────────────
// Engine
// ──────────────────────────────────────────────────

/// Drives remote tasks through their lifecycle and keeps the task store in
/// step with what the remote agents report.
///
/// Cheap to clone; clones share the transport, store, id source and locks.
#[derive(Clone)]
pub struct TaskEngine {
    transport: Arc<dyn Transport>,
    store: Arc<dyn TaskStore>,
    codec: JsonRpcCodec,
    retry: RetryPolicy,
    call_deadline: Option<Duration>,
    locks: Arc<KeyedLocks>,
}

impl fmt::Debug for TaskEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskEngine")
            .field("retry", &self.retry)
            .field("call_deadline", &self.call_deadline)
            .finish_non_exhaustive()
    }
}

impl TaskEngine {
    /// Create an engine with UUID correlation ids, the default retry policy
    /// and no deadline.
    pub fn new(transport: Arc<dyn Transport>, store: Arc<dyn TaskStore>) -> Self {
        Self {
            transport,
            store,
            codec: JsonRpcCodec::default(),
            retry: RetryPolicy::default(),
            call_deadline: None,
            locks: Arc::new(KeyedLocks::default()),
        }
    }

    /// Use `codec` (and its id source) for requests.
    pub fn with_codec(mut self, codec: JsonRpcCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Retry policy for transport calls.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Bound each operation, retries included.
    pub fn with_call_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.call_deadline = deadline;
        self
    }

    /// The retry policy in use.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Create a task running `action` on the agent described by `card`.
    ///
    /// Fails with `UnknownAction`, without touching the network, when the
    /// card does not advertise `action`. The same encoded request (same id and
    /// idempotency key) is re-sent on every retry.
    pub async fn create_task(
        &self,
        card: &AgentCard,
        action: &str,
        params: Map<String, Value>,
    ) -> A2AResult<Task> {
        if !card.supports_action(action) {
            return Err(A2AError::UnknownAction {
                action: action.to_string(),
                agent: card.name.clone(),
            });
        }

        let engine = self.clone();
        let agent = card.agent_ref();
        let action = action.to_string();
        detached(async move { engine.submit(agent, action, params).await }).await
    }

    /// Fetch the remote status of `task` and merge it into the local record.
    ///
    /// A remote `failed` status is a successful call returning a failed task.
    /// Calling this on a terminal task re-fetches and returns it unchanged.
    pub async fn get_task_status(&self, task: &Task) -> A2AResult<Task> {
        let engine = self.clone();
        let task = task.clone();
        detached(async move {
            let snapshot = engine
                .call::<TaskSnapshot>(&task.agent, METHOD_TASKS_GET, &TaskIdParams { id: task.id.clone() })
                .await?;
            engine.reconcile(task, snapshot).await
        })
        .await
    }

    /// Ask the remote agent to cancel `task` and merge the reported state.
    ///
    /// The agent may answer with a state other than `canceled` (e.g. the task
    /// already completed); whatever it reports is applied under the same rule.
    pub async fn cancel_task(&self, task: &Task) -> A2AResult<Task> {
        let engine = self.clone();
        let task = task.clone();
        detached(async move {
            let snapshot = engine
                .call::<TaskSnapshot>(
                    &task.agent,
                    METHOD_TASKS_CANCEL,
                    &TaskIdParams { id: task.id.clone() },
                )
                .await?;
            engine.reconcile(task, snapshot).await
        })
        .await
    }

    /// Poll `task` until it is terminal or `options.max_polls` is reached,
    /// doubling the delay between polls up to `options.max_interval`.
    ///
    /// Returns the last known task either way; check [`Task::is_terminal`].
    pub async fn wait_for_completion(&self, task: &Task, options: &PollOptions) -> A2AResult<Task> {
        let mut current = task.clone();
        let mut delay = options.interval;

        for poll in 1..=options.max_polls {
            if current.is_terminal() {
                break;
            }
            current = self.get_task_status(&current).await?;
            debug!(task_id = %current.id, poll, status = %current.status, "Polled task");
            if current.is_terminal() || poll == options.max_polls {
                break;
            }
            tokio::time::sleep(delay).await;
            delay = next_poll_delay(delay, options.max_interval);
        }
        Ok(current)
    }

    /// Look up the stored record for `task_id`.
    pub async fn find_task(&self, task_id: &str) -> A2AResult<Option<Task>> {
        self.store
            .find_by_id(task_id)
            .await
            .map_err(|e| A2AError::store(task_id, e))
    }

    async fn submit(
        &self,
        agent: AgentRef,
        action: String,
        params: Map<String, Value>,
    ) -> A2AResult<Task> {
        let request = CreateTaskParams {
            action: action.clone(),
            params: params.clone(),
            idempotency_key: uuid::Uuid::new_v4().to_string(),
        };
        let snapshot: TaskSnapshot = self.call(&agent, METHOD_TASKS_CREATE, &request).await?;

        if snapshot.id.is_empty() {
            return Err(A2AError::malformed_envelope(
                "tasks/create result carries an empty task id",
            ));
        }

        let task = Task {
            id: snapshot.id.clone(),
            agent,
            action,
            params,
            status: TaskState::Submitted,
            result: None,
            error: None,
            version: 0,
            updated_at: Utc::now(),
        };
        let task = self.reconcile(task, snapshot).await?;
        info!(task_id = %task.id, action = %task.action, status = %task.status, "Task created");
        Ok(task)
    }

    /// Encode, deliver with retries, decode, correlate and extract a result.
    async fn call<T: DeserializeOwned>(
        &self,
        agent: &AgentRef,
        method: &str,
        params: &impl Serialize,
    ) -> A2AResult<T> {
        let request = self.codec.encode_params(method, params)?;
        let body = JsonRpcCodec::to_bytes(&request)?;
        let deadline = self.call_deadline.map(|d| Instant::now() + d);

        debug!(method, id = %request.id, endpoint = %agent.endpoint, "Sending JSON-RPC request");

        let transport = &self.transport;
        let bytes = self
            .retry
            .run(method, deadline, || {
                transport.deliver(&agent.endpoint, agent.auth_scheme.as_ref(), body.clone())
            })
            .await?;

        let response = JsonRpcCodec::decode(&bytes)?;
        let response = JsonRpcCodec::correlate(&request, response)?;
        JsonRpcCodec::into_result(response)
    }

    /// Merge `snapshot` into the freshest known copy of `local` and persist.
    async fn reconcile(&self, local: Task, snapshot: TaskSnapshot) -> A2AResult<Task> {
        if snapshot.id != local.id {
            return Err(A2AError::malformed_envelope(format!(
                "agent answered for task '{}' while '{}' was requested",
                snapshot.id, local.id
            )));
        }

        let _guard = self.locks.lock(&local.id).await;

        let stored = self
            .store
            .find_by_id(&local.id)
            .await
            .map_err(|e| A2AError::store(&local.id, e))?;
        let base = match stored.clone() {
            Some(stored) => further_along(stored, local),
            None => local,
        };

        let (task, dirty) = match apply_snapshot(&base, &snapshot) {
            Transition::Advanced(next) => {
                debug!(
                    task_id = %next.id,
                    from = %base.status,
                    to = %next.status,
                    version = next.version,
                    "Task advanced"
                );
                (next, true)
            }
            Transition::Unchanged => {
                let dirty = stored.as_ref() != Some(&base);
                (base, dirty)
            }
            Transition::Stale { local, reported } => {
                warn!(
                    task_id = %base.id,
                    %local,
                    %reported,
                    "Ignoring stale remote status that would regress the task"
                );
                let dirty = stored.as_ref() != Some(&base);
                (base, dirty)
            }
        };

        if dirty {
            self.store
                .save(&task)
                .await
                .map_err(|e| A2AError::store(&task.id, e))?;
        }
        Ok(task)
    }
}

/// Double `delay`, capped at `max`.
fn next_poll_delay(delay: Duration, max: Duration) -> Duration {
    delay.saturating_mul(2).min(max)
}

/// Run `fut` on its own tokio task and wait for it.
///
/// Dropping the returned future does not cancel the spawned work.
async fn detached<T, F>(fut: F) -> A2AResult<T>
where
    T: Send + 'static,
    F: Future<Output = A2AResult<T>> + Send + 'static,
{
    match tokio::spawn(fut).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => Err(A2AError::Interrupted(e.to_string())),
    }
}
