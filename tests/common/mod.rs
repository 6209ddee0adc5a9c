//! Shared test utilities for integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use a2a_tasks::builders::AgentCardBuilder;
use a2a_tasks::client::{A2AClient, ClientConfig, JsonRpcCodec, Transport};
use a2a_tasks::error::{StoreError, TransportFailure};
use a2a_tasks::store::{InMemoryTaskStore, TaskStore};
use a2a_tasks::types::*;
use async_trait::async_trait;
use serde_json::Value;

pub const AGENT_URI: &str = "https://agent.example/";
pub const ENDPOINT: &str = "https://agent.example/rpc";

/// What the scripted agent answers to the next delivered request.
#[derive(Debug, Clone)]
pub enum Reply {
    /// JSON-RPC success carrying `result`, echoing the request id.
    Result(Value),
    /// JSON-RPC error object, echoing the request id.
    RpcError(i64, &'static str),
    /// JSON-RPC error object with a null id.
    UnattributedError(i64, &'static str),
    /// Snapshot in `status` for whichever task id the request names.
    Echo(&'static str),
    /// JSON-RPC success with a foreign id.
    WrongId(Value),
    /// Raw response bytes.
    Raw(&'static [u8]),
    /// Classified transport failure.
    Fail(TransportFailure),
    /// Wait, then answer.
    Delayed(Duration, Box<Reply>),
}

impl Reply {
    pub fn snapshot(id: &str, status: &str) -> Self {
        Reply::Result(serde_json::json!({"id": id, "status": status}))
    }

    pub fn delayed(delay: Duration, reply: Reply) -> Self {
        Reply::Delayed(delay, Box::new(reply))
    }
}

/// Transport that answers from a script and records every request.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<JsonRpcRequest>>,
    deliveries: AtomicUsize,
    cards: Mutex<HashMap<String, Result<Vec<u8>, TransportFailure>>>,
    fetched: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
        let transport = Self::default();
        transport.script.lock().unwrap().extend(replies);
        Arc::new(transport)
    }

    pub fn push(&self, reply: Reply) {
        self.script.lock().unwrap().push_back(reply);
    }

    /// Serve `card` at `url` for discovery.
    pub fn serve_card(&self, url: &str, card: &AgentCard) {
        self.cards
            .lock()
            .unwrap()
            .insert(url.to_string(), Ok(serde_json::to_vec(card).unwrap()));
    }

    pub fn serve_raw_card(&self, url: &str, body: &str) {
        self.cards
            .lock()
            .unwrap()
            .insert(url.to_string(), Ok(body.as_bytes().to_vec()));
    }

    pub fn fail_card(&self, url: &str, failure: TransportFailure) {
        self.cards
            .lock()
            .unwrap()
            .insert(url.to_string(), Err(failure));
    }

    pub fn deliveries(&self) -> usize {
        self.deliveries.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<JsonRpcRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }

    fn answer(request: &JsonRpcRequest, reply: Reply) -> Result<Vec<u8>, TransportFailure> {
        let response = match reply {
            Reply::Result(result) => JsonRpcResponse::success(request.id.clone(), result),
            Reply::RpcError(code, message) => JsonRpcResponse::error(
                request.id.clone(),
                JsonRpcError {
                    code,
                    message: message.to_string(),
                    data: None,
                },
            ),
            Reply::UnattributedError(code, message) => JsonRpcResponse::error(
                JsonRpcId::Null,
                JsonRpcError {
                    code,
                    message: message.to_string(),
                    data: None,
                },
            ),
            Reply::Echo(status) => JsonRpcResponse::success(
                request.id.clone(),
                serde_json::json!({"id": request.params["id"], "status": status}),
            ),
            Reply::WrongId(result) => {
                JsonRpcResponse::success(JsonRpcId::String("someone-else".into()), result)
            }
            Reply::Raw(bytes) => return Ok(bytes.to_vec()),
            Reply::Fail(failure) => return Err(failure),
            Reply::Delayed(..) => unreachable!("delays are unwrapped before answering"),
        };
        Ok(serde_json::to_vec(&response).unwrap())
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn deliver(
        &self,
        _endpoint: &str,
        _auth: Option<&AuthScheme>,
        body: Vec<u8>,
    ) -> Result<Vec<u8>, TransportFailure> {
        self.deliveries.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcCodec::decode_request(&body).expect("client sent a valid request");
        self.requests.lock().unwrap().push(request.clone());

        let mut reply = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Reply::Fail(TransportFailure::Other("script exhausted".into())));
        while let Reply::Delayed(delay, inner) = reply {
            tokio::time::sleep(delay).await;
            reply = *inner;
        }
        Self::answer(&request, reply)
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportFailure> {
        self.fetched.lock().unwrap().push(url.to_string());
        self.cards
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| {
                Err(TransportFailure::Http {
                    status: 404,
                    body: "not found".into(),
                })
            })
    }
}

/// Store whose writes always fail.
#[derive(Default)]
pub struct FailingStore {
    inner: InMemoryTaskStore,
}

#[async_trait]
impl TaskStore for FailingStore {
    async fn save(&self, _task: &Task) -> Result<(), StoreError> {
        Err(StoreError::Backend("disk full".into()))
    }

    async fn find_by_id(&self, task_id: &str) -> Result<Option<Task>, StoreError> {
        self.inner.find_by_id(task_id).await
    }
}

pub fn summarizer_card() -> AgentCard {
    AgentCardBuilder::new("Summarizer", ENDPOINT)
        .description("Summarizes documents")
        .with_action("summarize", "Summarize a text")
        .build()
}

pub fn client(transport: Arc<ScriptedTransport>, store: Arc<dyn TaskStore>) -> A2AClient {
    A2AClient::new(transport, store)
}

pub fn client_with(
    transport: Arc<ScriptedTransport>,
    store: Arc<dyn TaskStore>,
    config: ClientConfig,
) -> A2AClient {
    A2AClient::with_config(transport, store, config)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}
