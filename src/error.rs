//! A2A client error types — JSON-RPC error codes, transport failure
//! classification and the client-side error taxonomy.
//!
//! A remote task that reports `failed` is not an error: it comes back as a
//! [`Task`](crate::types::Task) with status `Failed`. Everything here is a
//! client, protocol, transport or storage problem.

use crate::types::{JsonRpcError, JsonRpcId};

// ---------------------------------------------------------------------------
// Standard JSON-RPC 2.0 error codes
// ---------------------------------------------------------------------------

/// Invalid JSON was received by the server.
pub const PARSE_ERROR: i64 = -32700;

/// The JSON sent is not a valid Request object.
pub const INVALID_REQUEST: i64 = -32600;

/// The method does not exist / is not available.
pub const METHOD_NOT_FOUND: i64 = -32601;

/// Invalid method parameter(s).
pub const INVALID_PARAMS: i64 = -32602;

/// Internal JSON-RPC error.
pub const INTERNAL_ERROR: i64 = -32603;

// ---------------------------------------------------------------------------
// A2A-specific error codes
// ---------------------------------------------------------------------------

/// The requested task was not found.
pub const TASK_NOT_FOUND: i64 = -32001;

/// The task cannot be canceled in its current state.
pub const TASK_NOT_CANCELABLE: i64 = -32002;

/// The requested operation is not supported.
pub const UNSUPPORTED_OPERATION: i64 = -32004;

// ---------------------------------------------------------------------------
// Transport failures
// ---------------------------------------------------------------------------

/// Classified failure of a single transport call.
///
/// The retry policy keys off this classification: timeouts, refused
/// connections and HTTP 5xx are retried, everything else is surfaced at once.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportFailure {
    /// The call did not complete in time.
    #[error("timeout: {0}")]
    Timeout(String),

    /// The remote end could not be reached.
    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    /// The remote answered with a non-2xx HTTP status.
    #[error("HTTP {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        body: String,
    },

    /// Any other failure (request building, body read, ...).
    #[error("transport error: {0}")]
    Other(String),
}

impl TransportFailure {
    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportFailure::Timeout(_) | TransportFailure::ConnectionRefused(_) => true,
            TransportFailure::Http { status, .. } => (500..600).contains(status),
            TransportFailure::Other(_) => false,
        }
    }

    /// HTTP status, if the failure carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportFailure::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Store failures
// ---------------------------------------------------------------------------

/// Failure reported by a [`TaskStore`](crate::store::TaskStore) backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The backend rejected or failed the operation.
    #[error("store backend error: {0}")]
    Backend(String),

    /// A record could not be encoded or decoded.
    #[error("store serialization error: {0}")]
    Serialization(String),

    /// Filesystem failure.
    #[error("store I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// A2AError enum
// ---------------------------------------------------------------------------

/// Unified error type for all client operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum A2AError {
    /// The agent card could not be fetched.
    #[error("agent unreachable at {url}: {source}")]
    AgentUnreachable {
        /// URL that was fetched.
        url: String,
        /// Underlying transport failure.
        source: TransportFailure,
    },

    /// The agent card was fetched but is not a valid card.
    #[error("malformed agent card from {url}: {message}")]
    MalformedAgentCard {
        /// URL that was fetched.
        url: String,
        /// Parse or validation failure.
        message: String,
    },

    /// The action is not advertised by the target agent.
    #[error("agent '{agent}' does not advertise action '{action}'")]
    UnknownAction {
        /// Requested action.
        action: String,
        /// Agent name.
        agent: String,
    },

    /// Caller input rejected before any network call.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A response (or request) envelope violated JSON-RPC 2.0.
    #[error("malformed JSON-RPC envelope: {0}")]
    MalformedEnvelope(String),

    /// A response id did not match the request it should answer.
    #[error("response id {actual} does not match request id {expected}")]
    MismatchedId {
        /// Id of the request sent.
        expected: JsonRpcId,
        /// Id carried by the response.
        actual: JsonRpcId,
    },

    /// Every attempt allowed by the retry budget failed.
    #[error("transport failed after {attempts} attempt(s): {last}")]
    TransportExhausted {
        /// Attempts made.
        attempts: u32,
        /// Failure of the final attempt.
        last: TransportFailure,
    },

    /// A transport failure that retrying cannot fix (HTTP 4xx, ...).
    #[error("request rejected: {0}")]
    TransportRejected(TransportFailure),

    /// The remote agent answered with a JSON-RPC `error` object.
    #[error("JSON-RPC error {code}: {message}")]
    RemoteError {
        /// JSON-RPC error code.
        code: i64,
        /// Error message.
        message: String,
        /// Optional structured error data.
        data: Option<serde_json::Value>,
    },

    /// The task store failed; the local record of `task_id` may be stale.
    #[error("task store failed for task '{task_id}': {source}")]
    StoreFailure {
        /// Task whose record was being read or written.
        task_id: String,
        /// Backend failure.
        source: StoreError,
    },

    /// The background task running the operation was cancelled before it
    /// finished (runtime shutdown).
    #[error("operation interrupted: {0}")]
    Interrupted(String),
}

/// Convenience result type for A2A operations.
pub type A2AResult<T> = Result<T, A2AError>;

impl A2AError {
    /// Create an `InvalidInput` error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create a `MalformedEnvelope` error.
    pub fn malformed_envelope(message: impl Into<String>) -> Self {
        Self::MalformedEnvelope(message.into())
    }

    /// Wrap a store failure for `task_id`.
    pub fn store(task_id: impl Into<String>, source: StoreError) -> Self {
        Self::StoreFailure {
            task_id: task_id.into(),
            source,
        }
    }

    /// The JSON-RPC code of a `RemoteError`.
    pub fn remote_code(&self) -> Option<i64> {
        match self {
            A2AError::RemoteError { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether the remote agent reported the task as unknown.
    pub fn is_task_not_found(&self) -> bool {
        self.remote_code() == Some(TASK_NOT_FOUND)
    }

    /// Whether the failure is a wire-level protocol violation.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            A2AError::MalformedEnvelope(_) | A2AError::MismatchedId { .. }
        )
    }
}

impl From<JsonRpcError> for A2AError {
    fn from(err: JsonRpcError) -> Self {
        A2AError::RemoteError {
            code: err.code,
            message: err.message,
            data: err.data,
        }
    }
}
