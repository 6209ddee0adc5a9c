//! # a2a-tasks — client SDK for the Agent-to-Agent (A2A) protocol
//!
//! Discover remote agents, submit actions to them as asynchronous tasks, and
//! track those tasks to completion over JSON-RPC 2.0.
//!
//! ## Overview
//!
//! - **Discovery** — fetch an [`AgentCard`] from an agent's well-known URI
//! - **Task creation** — `tasks/create`, validated against the card's actions
//! - **Status tracking** — `tasks/get` with a monotonic state machine:
//!   `Submitted < Working < {Completed, Failed, Canceled}`; stale remote
//!   reports never move a task backwards
//! - **Retries** — timeouts, refused connections and HTTP 5xx are retried
//!   with exponential backoff and jitter; 4xx and JSON-RPC errors are not
//! - **Persistence** — every change goes through a pluggable [`store::TaskStore`]
//!
//! ## Feature flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `http`  | yes     | reqwest-backed [`client::HttpTransport`] |
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use a2a_tasks::client::{A2AClient, HttpTransport};
//! use a2a_tasks::store::InMemoryTaskStore;
//! use a2a_tasks::TaskState;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = A2AClient::new(
//!         Arc::new(HttpTransport::new()),
//!         Arc::new(InMemoryTaskStore::new()),
//!     );
//!
//!     let card = client.discover_agent("https://agent.example/").await?;
//!     let task = client
//!         .create_task(&card, "summarize", serde_json::json!({"text": "..."}))
//!         .await?;
//!
//!     let task = client.wait_for_completion(&task).await?;
//!     match task.status {
//!         TaskState::Completed => println!("result: {:?}", task.result),
//!         TaskState::Failed => println!("failed: {:?}", task.error),
//!         other => println!("still {other}"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`client::A2AClient`] — public facade
//! - [`client::TaskEngine`] — task lifecycle, retry, persistence
//! - [`client::CardResolver`] — agent card discovery
//! - [`client::JsonRpcCodec`] — envelope encoding, decoding and id correlation
//! - [`client::Transport`] — delivery capability (bring your own, or use
//!   [`client::HttpTransport`])
//! - [`store::TaskStore`] — persistence contract, with
//!   [`store::InMemoryTaskStore`] and [`store::FileTaskStore`] backends
//! - [`error::A2AError`] — error taxonomy

pub mod builders;
pub mod client;
pub mod error;
pub mod store;
pub mod types;

/// Prelude module that re-exports commonly used types and traits.
///
/// ```
/// use a2a_tasks::prelude::*;
/// ```
pub mod prelude {
    pub use crate::builders::{AgentCardBuilder, ClientBuilder};
    pub use crate::client::{A2AClient, ClientConfig, PollOptions, RetryPolicy, Transport};
    pub use crate::error::{A2AError, A2AResult, StoreError, TransportFailure};
    pub use crate::store::{InMemoryTaskStore, TaskStore};
    pub use crate::types::{AgentAction, AgentCard, AgentRef, AuthScheme, Task, TaskError, TaskState};

    #[cfg(feature = "http")]
    pub use crate::client::HttpTransport;
}

pub use builders::{AgentCardBuilder, ClientBuilder};
pub use error::{A2AError, A2AResult};
pub use types::*;
