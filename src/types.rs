//! A2A client data model and JSON-RPC 2.0 envelopes.
//!
//! Wire format is camelCase JSON; task states are lowercase strings
//! (`"submitted"`, `"working"`, ...).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// JSON-RPC protocol version stamped on every envelope.
pub const JSONRPC_VERSION: &str = "2.0";

// ============================================================================
// Task state machine
// ============================================================================

/// The lifecycle state of a task.
///
/// States are ordered `Submitted < Working < {Completed, Failed, Canceled}`.
/// The three terminal states share a rank; once a task is terminal it never
/// moves again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Accepted by the remote agent, no progress reported yet.
    Submitted,
    /// Remote agent reports the task is in progress.
    Working,
    /// Terminal success; the task carries a result.
    Completed,
    /// Terminal failure; the task carries an error detail.
    Failed,
    /// Terminal; aborted by the caller or the remote agent.
    Canceled,
}

impl TaskState {
    /// Position in the monotonic ordering.
    pub fn rank(self) -> u8 {
        match self {
            TaskState::Submitted => 0,
            TaskState::Working => 1,
            TaskState::Completed | TaskState::Failed | TaskState::Canceled => 2,
        }
    }

    /// Whether the state is final.
    pub fn is_terminal(self) -> bool {
        self.rank() == 2
    }

    /// Whether moving from `self` to `next` is a legal forward transition.
    ///
    /// Re-reporting the same non-terminal state is allowed (it is a no-op);
    /// anything leaving a terminal state is not.
    pub fn can_transition_to(self, next: TaskState) -> bool {
        if self.is_terminal() {
            return self == next;
        }
        next.rank() >= self.rank()
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::Submitted => "submitted",
            TaskState::Working => "working",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
            TaskState::Canceled => "canceled",
        };
        write!(f, "{}", s)
    }
}

// ============================================================================
// Auth schemes
// ============================================================================

/// Credential descriptor attached to outgoing calls.
///
/// Opaque to the task engine: it is threaded through to the
/// [`Transport`](crate::client::Transport), which decides how to attach it.
///
/// JSON: `{"type": "oauth2", "clientId": "...", "authorizationUrl": "...", ...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
#[non_exhaustive]
pub enum AuthScheme {
    /// OAuth 2.0 authorization.
    #[serde(rename = "oauth2", rename_all = "camelCase")]
    OAuth2 {
        /// Client identifier registered with the authorization server.
        client_id: String,
        /// Authorization endpoint.
        authorization_url: String,
        /// Token endpoint.
        token_url: String,
        /// Scopes requested for the session.
        #[serde(default)]
        scopes: Vec<String>,
    },
}

impl AuthScheme {
    /// Short name of the scheme variant (`"oauth2"`).
    pub fn kind(&self) -> &'static str {
        match self {
            AuthScheme::OAuth2 { .. } => "oauth2",
        }
    }

    /// Key used to look up a caller-provided credential for this scheme.
    pub fn credential_key(&self) -> &str {
        match self {
            AuthScheme::OAuth2 { client_id, .. } => client_id,
        }
    }
}

// ============================================================================
// Agent card
// ============================================================================

/// An action advertised by a remote agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentAction {
    /// Action name used in `tasks/create`.
    pub name: String,

    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Reference to the input schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<String>,

    /// Reference to the output schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<String>,
}

/// Immutable descriptor of a remote agent, fetched from its well-known URI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    /// Agent name.
    pub name: String,

    /// Description of the agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Agent version string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// JSON-RPC endpoint receiving task requests.
    pub endpoint: String,

    /// Actions the agent accepts.
    #[serde(default)]
    pub actions: Vec<AgentAction>,

    /// Auth scheme required by the endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_scheme: Option<AuthScheme>,
}

impl AgentCard {
    /// Look up an advertised action by name.
    pub fn action(&self, name: &str) -> Option<&AgentAction> {
        self.actions.iter().find(|a| a.name == name)
    }

    /// Whether the agent advertises `name`.
    pub fn supports_action(&self, name: &str) -> bool {
        self.action(name).is_some()
    }

    /// Reference used by tasks targeting this agent.
    pub fn agent_ref(&self) -> AgentRef {
        AgentRef {
            endpoint: self.endpoint.clone(),
            auth_scheme: self.auth_scheme.clone(),
        }
    }
}

/// Where a task lives: the endpoint plus the credentials needed to reach it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRef {
    /// JSON-RPC endpoint of the agent owning the task.
    pub endpoint: String,

    /// Auth scheme attached to calls for this task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_scheme: Option<AuthScheme>,
}

// ============================================================================
// Task
// ============================================================================

/// Failure detail reported by a remote agent for a failed task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskError {
    /// Agent-specific error code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,

    /// Human-readable message.
    pub message: String,

    /// Structured detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A unit of asynchronous work submitted to a remote agent.
///
/// `id` is assigned by the remote agent and never changes. `status` only moves
/// forward. `result` is present only when `Completed`, `error` only when
/// `Failed`. `version` increments on every locally applied change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Remote-assigned task identifier.
    pub id: String,

    /// Target agent.
    pub agent: AgentRef,

    /// Action the task runs.
    pub action: String,

    /// Input parameters sent on creation.
    #[serde(default)]
    pub params: Map<String, Value>,

    /// Current state.
    pub status: TaskState,

    /// Result payload (terminal success only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Error detail (terminal failure only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskError>,

    /// Local change counter.
    #[serde(default)]
    pub version: u64,

    /// When the local copy last changed.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Whether the task reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Task state as reported by a remote agent in a `tasks/*` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSnapshot {
    /// Remote task id.
    pub id: String,

    /// Reported state.
    pub status: TaskState,

    /// Result payload, if the agent attached one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Error detail, if the agent attached one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskError>,
}

// ============================================================================
// Request parameter types
// ============================================================================

/// Parameters for `tasks/create`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskParams {
    /// Action name.
    pub action: String,

    /// Action input.
    pub params: Map<String, Value>,

    /// Client-generated key, stable across retries of the same creation.
    pub idempotency_key: String,
}

/// Parameters for `tasks/get` and `tasks/cancel`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskIdParams {
    /// Remote task id.
    pub id: String,
}

// ============================================================================
// JSON-RPC Foundation
// ============================================================================

/// A JSON-RPC 2.0 request ID.
///
/// Can be a string, number, or null (malformed-request replies).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcId {
    /// String identifier.
    String(String),
    /// Numeric identifier.
    Number(i64),
    /// Null.
    Null,
}

impl JsonRpcId {
    /// Whether this is the null/zero id used when a server cannot tell which
    /// request it is answering.
    pub fn is_unattributed(&self) -> bool {
        matches!(self, JsonRpcId::Null | JsonRpcId::Number(0))
    }
}

impl fmt::Display for JsonRpcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonRpcId::String(s) => write!(f, "{}", s),
            JsonRpcId::Number(n) => write!(f, "{}", n),
            JsonRpcId::Null => write!(f, "null"),
        }
    }
}

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version — always "2.0".
    pub jsonrpc: String,

    /// Method name.
    pub method: String,

    /// Method parameters.
    pub params: Map<String, Value>,

    /// Correlation id.
    pub id: JsonRpcId,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i64,

    /// Human-readable error message.
    pub message: String,

    /// Optional structured error data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// The exactly-one-of body of a response.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponsePayload {
    /// `result` member (may itself be JSON `null`).
    Result(Value),
    /// `error` member.
    Error(JsonRpcError),
}

/// A JSON-RPC 2.0 response.
///
/// Holding the body as [`ResponsePayload`] makes "both" and "neither"
/// unrepresentable; deserialization rejects such documents.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcResponse {
    /// Id of the request this answers (`Null` when absent).
    pub id: JsonRpcId,

    /// Result or error.
    pub payload: ResponsePayload,
}

impl JsonRpcResponse {
    /// Create a successful JSON-RPC response.
    pub fn success(id: JsonRpcId, result: Value) -> Self {
        Self {
            id,
            payload: ResponsePayload::Result(result),
        }
    }

    /// Create an error JSON-RPC response.
    pub fn error(id: JsonRpcId, error: JsonRpcError) -> Self {
        Self {
            id,
            payload: ResponsePayload::Error(error),
        }
    }

    /// The result member, if this is a success.
    pub fn result(&self) -> Option<&Value> {
        match &self.payload {
            ResponsePayload::Result(v) => Some(v),
            ResponsePayload::Error(_) => None,
        }
    }

    /// The error member, if this is a failure.
    pub fn error_object(&self) -> Option<&JsonRpcError> {
        match &self.payload {
            ResponsePayload::Error(e) => Some(e),
            ResponsePayload::Result(_) => None,
        }
    }
}

impl Serialize for JsonRpcResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("jsonrpc", JSONRPC_VERSION)?;
        match &self.payload {
            ResponsePayload::Result(v) => map.serialize_entry("result", v)?,
            ResponsePayload::Error(e) => map.serialize_entry("error", e)?,
        }
        map.serialize_entry("id", &self.id)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for JsonRpcResponse {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let Value::Object(mut obj) = value else {
            return Err(D::Error::custom("response must be a JSON object"));
        };

        match obj.get("jsonrpc") {
            Some(Value::String(v)) if v == JSONRPC_VERSION => {}
            Some(other) => {
                return Err(D::Error::custom(format!(
                    "unsupported jsonrpc version: {other}"
                )))
            }
            None => return Err(D::Error::custom("missing 'jsonrpc' member")),
        }

        let id = match obj.remove("id") {
            None | Some(Value::Null) => JsonRpcId::Null,
            Some(v) => serde_json::from_value(v).map_err(D::Error::custom)?,
        };

        let payload = match (obj.remove("result"), obj.remove("error")) {
            (Some(result), None) => ResponsePayload::Result(result),
            (None, Some(error)) => {
                ResponsePayload::Error(serde_json::from_value(error).map_err(D::Error::custom)?)
            }
            (Some(_), Some(_)) => {
                return Err(D::Error::custom(
                    "response contains both 'result' and 'error'",
                ))
            }
            (None, None) => {
                return Err(D::Error::custom(
                    "response has neither 'result' nor 'error'",
                ))
            }
        };

        Ok(Self { id, payload })
    }
}
