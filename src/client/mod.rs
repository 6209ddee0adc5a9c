//! A2A client — discover agents and drive the tasks submitted to them.
//!
//! - [`A2AClient`] — facade: `discover_agent`, `create_task`, `get_task_status`
//! - [`TaskEngine`] — task lifecycle, non-regressing state merges, persistence
//! - [`CardResolver`] — agent card discovery via the well-known URI
//! - [`JsonRpcCodec`] — JSON-RPC 2.0 encoding, decoding and id correlation
//! - [`RetryPolicy`] — bounded exponential backoff with jitter
//! - [`Transport`] / [`HttpTransport`] — pluggable delivery layer
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use a2a_tasks::client::{A2AClient, HttpTransport};
//! use a2a_tasks::store::InMemoryTaskStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = A2AClient::new(
//!     Arc::new(HttpTransport::new()),
//!     Arc::new(InMemoryTaskStore::new()),
//! );
//! let card = client.discover_agent("http://localhost:7420").await?;
//! let task = client
//!     .create_task(&card, "echo", serde_json::json!({"text": "hi"}))
//!     .await?;
//! let task = client.get_task_status(&task).await?;
//! println!("Task {} — status: {}", task.id, task.status);
//! # Ok(())
//! # }
//! ```

mod a2a_client;
mod card_resolver;
mod codec;
mod lifecycle;
mod retry;
mod transport;

pub use a2a_client::{A2AClient, ClientConfig};
pub use card_resolver::{CardResolver, AGENT_CARD_WELL_KNOWN_PATH, PREV_AGENT_CARD_WELL_KNOWN_PATH};
pub use codec::{IdSource, JsonRpcCodec, SequentialIds, UuidIds};
pub use lifecycle::{
    apply_snapshot, PollOptions, TaskEngine, Transition, METHOD_TASKS_CANCEL, METHOD_TASKS_CREATE,
    METHOD_TASKS_GET,
};
pub use retry::{Jitter, RetryPolicy};
pub use transport::Transport;

#[cfg(feature = "http")]
pub use transport::{HttpTransport, TransportConfig};
