//! JSON-RPC 2.0 codec: request encoding, response decoding and id
//! correlation.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{A2AError, A2AResult};
use crate::types::{JsonRpcId, JsonRpcRequest, JsonRpcResponse, ResponsePayload, JSONRPC_VERSION};

/// Source of correlation ids. Must never repeat within one instance.
pub trait IdSource: Send + Sync {
    /// Produce the next id.
    fn next_id(&self) -> JsonRpcId;
}

/// Monotonic numeric ids starting at 1, scoped to one instance.
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: AtomicI64,
}

impl SequentialIds {
    /// Start counting at 1.
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdSource for SequentialIds {
    fn next_id(&self) -> JsonRpcId {
        JsonRpcId::Number(self.next.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// Random UUID v4 string ids.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIds;

impl IdSource for UuidIds {
    fn next_id(&self) -> JsonRpcId {
        JsonRpcId::String(uuid::Uuid::new_v4().to_string())
    }
}

/// Encodes requests and validates responses.
///
/// Cloning shares the id source, so clones never hand out the same id.
#[derive(Clone)]
pub struct JsonRpcCodec {
    ids: Arc<dyn IdSource>,
}

impl fmt::Debug for JsonRpcCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonRpcCodec").finish_non_exhaustive()
    }
}

impl Default for JsonRpcCodec {
    fn default() -> Self {
        Self::new(Arc::new(UuidIds))
    }
}

impl JsonRpcCodec {
    /// Create a codec drawing ids from `ids`.
    pub fn new(ids: Arc<dyn IdSource>) -> Self {
        Self { ids }
    }

    /// Build a request for `method` with a fresh id.
    pub fn encode(&self, method: &str, params: Map<String, Value>) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.to_string(),
            params,
            id: self.ids.next_id(),
        }
    }

    /// Build a request from any serializable params struct.
    ///
    /// Fails with `InvalidInput` if `params` does not serialize to a JSON
    /// object.
    pub fn encode_params(&self, method: &str, params: &impl Serialize) -> A2AResult<JsonRpcRequest> {
        match serde_json::to_value(params) {
            Ok(Value::Object(map)) => Ok(self.encode(method, map)),
            Ok(other) => Err(A2AError::invalid_input(format!(
                "params for '{method}' must be a JSON object, got {other}"
            ))),
            Err(e) => Err(A2AError::invalid_input(format!(
                "failed to serialize params for '{method}': {e}"
            ))),
        }
    }

    /// Serialize a request to bytes.
    pub fn to_bytes(request: &JsonRpcRequest) -> A2AResult<Vec<u8>> {
        serde_json::to_vec(request)
            .map_err(|e| A2AError::malformed_envelope(format!("failed to serialize request: {e}")))
    }

    /// Parse a response envelope.
    ///
    /// Fails with `MalformedEnvelope` when the bytes are not a JSON-RPC 2.0
    /// response, including when both or neither of `result`/`error` appear.
    pub fn decode(bytes: &[u8]) -> A2AResult<JsonRpcResponse> {
        serde_json::from_slice(bytes)
            .map_err(|e| A2AError::malformed_envelope(format!("invalid response: {e}")))
    }

    /// Parse a request envelope.
    pub fn decode_request(bytes: &[u8]) -> A2AResult<JsonRpcRequest> {
        let request: JsonRpcRequest = serde_json::from_slice(bytes)
            .map_err(|e| A2AError::malformed_envelope(format!("invalid request: {e}")))?;
        if request.jsonrpc != JSONRPC_VERSION {
            return Err(A2AError::malformed_envelope(format!(
                "unsupported jsonrpc version: {}",
                request.jsonrpc
            )));
        }
        Ok(request)
    }

    /// Check that `response` answers `request`.
    ///
    /// A null or zero id is accepted only on an error response: that is how a
    /// server answers a request it could not parse.
    pub fn correlate(
        request: &JsonRpcRequest,
        response: JsonRpcResponse,
    ) -> A2AResult<JsonRpcResponse> {
        if response.id == request.id {
            return Ok(response);
        }
        if response.id.is_unattributed() && response.error_object().is_some() {
            return Ok(response);
        }
        Err(A2AError::MismatchedId {
            expected: request.id.clone(),
            actual: response.id,
        })
    }

    /// Extract the typed result, turning an `error` member into `RemoteError`.
    pub fn into_result<T: DeserializeOwned>(response: JsonRpcResponse) -> A2AResult<T> {
        match response.payload {
            ResponsePayload::Error(error) => Err(error.into()),
            ResponsePayload::Result(result) => serde_json::from_value(result).map_err(|e| {
                A2AError::malformed_envelope(format!("unexpected result shape: {e}"))
            }),
        }
    }
}
