//! High-level A2A client: the public entry point composing discovery and the
//! task lifecycle engine.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::error::{A2AError, A2AResult};
use crate::store::TaskStore;
use crate::types::{AgentCard, Task};

use super::card_resolver::CardResolver;
use super::codec::JsonRpcCodec;
use super::lifecycle::{PollOptions, TaskEngine};
use super::retry::RetryPolicy;
use super::transport::Transport;

/// Client-wide settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientConfig {
    /// Retry policy for task calls.
    pub retry: RetryPolicy,
    /// Upper bound on each discovery or task call, retries included. The
    /// store merge after a response has arrived is not bounded.
    pub call_deadline: Option<Duration>,
    /// Cadence for [`A2AClient::wait_for_completion`].
    pub poll: PollOptions,
    /// Agent card path overriding the well-known default.
    pub card_path: Option<String>,
}

/// Client for discovering A2A agents and tracking the tasks submitted to
/// them.
///
/// - `discover_agent` — fetch an agent's card from its well-known URI
/// - `create_task` — submit an action as a task (`tasks/create`)
/// - `get_task_status` — refresh a task (`tasks/get`)
/// - `cancel_task` — request cancellation (`tasks/cancel`)
///
/// Holds no mutable state of its own; task records live in the configured
/// [`TaskStore`].
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use a2a_tasks::client::{A2AClient, HttpTransport};
/// use a2a_tasks::store::InMemoryTaskStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = A2AClient::new(
///     Arc::new(HttpTransport::new()),
///     Arc::new(InMemoryTaskStore::new()),
/// );
///
/// let card = client.discover_agent("https://agent.example/").await?;
/// let task = client
///     .create_task(&card, "summarize", serde_json::json!({"text": "..."}))
///     .await?;
/// let task = client.wait_for_completion(&task).await?;
/// println!("{} -> {}", task.id, task.status);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct A2AClient {
    resolver: CardResolver,
    engine: TaskEngine,
    poll: PollOptions,
}

impl std::fmt::Debug for A2AClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("A2AClient")
            .field("resolver", &self.resolver)
            .field("engine", &self.engine)
            .field("poll", &self.poll)
            .finish()
    }
}

impl A2AClient {
    /// Create a client with default configuration.
    pub fn new(transport: Arc<dyn Transport>, store: Arc<dyn TaskStore>) -> Self {
        Self::with_config(transport, store, ClientConfig::default())
    }

    /// Create a client with explicit configuration.
    pub fn with_config(
        transport: Arc<dyn Transport>,
        store: Arc<dyn TaskStore>,
        config: ClientConfig,
    ) -> Self {
        Self::from_parts(transport, store, JsonRpcCodec::default(), config)
    }

    pub(crate) fn from_parts(
        transport: Arc<dyn Transport>,
        store: Arc<dyn TaskStore>,
        codec: JsonRpcCodec,
        config: ClientConfig,
    ) -> Self {
        let mut resolver =
            CardResolver::new(transport.clone()).with_timeout(config.call_deadline);
        if let Some(path) = config.card_path {
            resolver = resolver.with_card_path(path);
        }
        let engine = TaskEngine::new(transport, store)
            .with_codec(codec)
            .with_retry(config.retry)
            .with_call_deadline(config.call_deadline);
        Self {
            resolver,
            engine,
            poll: config.poll,
        }
    }

    /// The underlying lifecycle engine.
    pub fn engine(&self) -> &TaskEngine {
        &self.engine
    }

    /// Fetch the agent card published under `agent_uri`'s origin.
    ///
    /// Never cached: every call goes to the network.
    pub async fn discover_agent(&self, agent_uri: &str) -> A2AResult<AgentCard> {
        if agent_uri.trim().is_empty() {
            return Err(A2AError::invalid_input("agent URI must not be empty"));
        }
        self.resolver.resolve(agent_uri).await
    }

    /// Submit `action` with `params` (a JSON object) to the agent described by
    /// `card`.
    ///
    /// Returns the task as acknowledged by the agent, already persisted.
    pub async fn create_task(&self, card: &AgentCard, action: &str, params: Value) -> A2AResult<Task> {
        if action.trim().is_empty() {
            return Err(A2AError::invalid_input("action name must not be empty"));
        }
        if card.endpoint.trim().is_empty() {
            return Err(A2AError::invalid_input(format!(
                "agent card '{}' has no endpoint",
                card.name
            )));
        }
        let params = match params {
            Value::Object(map) => map,
            other => {
                return Err(A2AError::invalid_input(format!(
                    "task params must be a JSON object, got {other}"
                )))
            }
        };
        self.engine.create_task(card, action, params).await
    }

    /// Refresh `task` from its agent.
    ///
    /// A task the agent reports as `failed` is returned successfully with
    /// status `Failed`; only client, protocol, transport or store problems
    /// produce an error.
    pub async fn get_task_status(&self, task: &Task) -> A2AResult<Task> {
        validate_task(task)?;
        self.engine.get_task_status(task).await
    }

    /// Request cancellation of `task`.
    pub async fn cancel_task(&self, task: &Task) -> A2AResult<Task> {
        validate_task(task)?;
        self.engine.cancel_task(task).await
    }

    /// Poll `task` with the configured cadence until it is terminal or the
    /// poll budget runs out.
    pub async fn wait_for_completion(&self, task: &Task) -> A2AResult<Task> {
        validate_task(task)?;
        self.engine.wait_for_completion(task, &self.poll).await
    }

    /// Refresh several tasks concurrently. Results are in input order.
    pub async fn refresh_all(&self, tasks: &[Task]) -> Vec<A2AResult<Task>> {
        futures::future::join_all(tasks.iter().map(|t| self.get_task_status(t))).await
    }

    /// Look up the stored record for `task_id`.
    pub async fn find_task(&self, task_id: &str) -> A2AResult<Option<Task>> {
        self.engine.find_task(task_id).await
    }
}

fn validate_task(task: &Task) -> A2AResult<()> {
    if task.id.is_empty() {
        return Err(A2AError::invalid_input("task has no id"));
    }
    if task.agent.endpoint.trim().is_empty() {
        return Err(A2AError::invalid_input(format!(
            "task '{}' has no agent endpoint",
            task.id
        )));
    }
    Ok(())
}
