//! Builder patterns for ergonomic construction of agent cards and clients.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::client::{A2AClient, ClientConfig, IdSource, JsonRpcCodec, PollOptions, RetryPolicy, Transport};
use crate::error::{A2AError, A2AResult};
use crate::store::TaskStore;
use crate::types::{AgentAction, AgentCard, AuthScheme};

/// Builder for constructing [`AgentCard`] values.
///
/// Mostly useful for tests and for agents that publish their own card.
///
/// # Example
///
/// ```
/// use a2a_tasks::builders::AgentCardBuilder;
///
/// let card = AgentCardBuilder::new("Summarizer", "https://agent.example/rpc")
///     .description("Summarizes documents")
///     .version("1.0.0")
///     .with_action("summarize", "Summarize a text")
///     .build();
/// assert!(card.supports_action("summarize"));
/// ```
#[derive(Debug, Clone)]
pub struct AgentCardBuilder {
    name: String,
    description: Option<String>,
    version: Option<String>,
    endpoint: String,
    actions: Vec<AgentAction>,
    auth_scheme: Option<AuthScheme>,
}

impl AgentCardBuilder {
    /// Create a new builder with the required fields.
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            version: None,
            endpoint: endpoint.into(),
            actions: Vec::new(),
            auth_scheme: None,
        }
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the version string.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Advertise an action.
    pub fn with_action(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.actions.push(AgentAction {
            name: name.into(),
            description: Some(description.into()),
            input_schema: None,
            output_schema: None,
        });
        self
    }

    /// Advertise a fully specified action.
    pub fn with_action_spec(mut self, action: AgentAction) -> Self {
        self.actions.push(action);
        self
    }

    /// Require an auth scheme on the endpoint.
    pub fn with_auth_scheme(mut self, scheme: AuthScheme) -> Self {
        self.auth_scheme = Some(scheme);
        self
    }

    /// Build the [`AgentCard`].
    pub fn build(self) -> AgentCard {
        AgentCard {
            name: self.name,
            description: self.description,
            version: self.version,
            endpoint: self.endpoint,
            actions: self.actions,
            auth_scheme: self.auth_scheme,
        }
    }
}

/// Builder for [`A2AClient`].
///
/// A [`TaskStore`] must always be supplied; there is no implicit in-memory
/// default, so task records are never silently kept in a volatile place. When
/// no transport is given and the `http` feature is on, an
/// [`HttpTransport`](crate::client::HttpTransport) is built from the
/// timeout, headers and bearer tokens set here.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use a2a_tasks::builders::ClientBuilder;
/// use a2a_tasks::store::InMemoryTaskStore;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ClientBuilder::new()
///     .with_store(Arc::new(InMemoryTaskStore::new()))
///     .with_timeout(Duration::from_secs(30))
///     .with_call_deadline(Duration::from_secs(90))
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct ClientBuilder {
    transport: Option<Arc<dyn Transport>>,
    store: Option<Arc<dyn TaskStore>>,
    ids: Option<Arc<dyn IdSource>>,
    config: ClientConfig,
    timeout: Option<Duration>,
    headers: Vec<(String, String)>,
    bearer_tokens: Vec<(String, String)>,
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("has_transport", &self.transport.is_some())
            .field("has_store", &self.store.is_some())
            .field("config", &self.config)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ClientBuilder {
    /// Create a new client builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom transport.
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Persist task records in `store`.
    pub fn with_store(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Draw JSON-RPC correlation ids from `ids`.
    pub fn with_id_source(mut self, ids: Arc<dyn IdSource>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Retry policy for task calls.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    /// Bound the network phase of each discovery or task call, retries included.
    pub fn with_call_deadline(mut self, deadline: Duration) -> Self {
        self.config.call_deadline = Some(deadline);
        self
    }

    /// Polling cadence for `wait_for_completion`.
    pub fn with_poll_options(mut self, poll: PollOptions) -> Self {
        self.config.poll = poll;
        self
    }

    /// Override the agent card path.
    pub fn with_card_path(mut self, path: impl Into<String>) -> Self {
        self.config.card_path = Some(path.into());
        self
    }

    /// Set the per-request HTTP timeout of the built-in transport.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Add a custom HTTP header to the built-in transport.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Register a bearer token for an auth scheme credential key (the OAuth2
    /// client id) on the built-in transport.
    pub fn with_bearer_token(
        mut self,
        credential_key: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        self.bearer_tokens.push((credential_key.into(), token.into()));
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// [`A2AError::InvalidInput`] if no store was supplied, or if no
    /// transport was supplied and the `http` feature is disabled.
    pub fn build(self) -> A2AResult<A2AClient> {
        let store = self
            .store
            .ok_or_else(|| A2AError::invalid_input("a task store is required"))?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => default_transport(self.timeout, &self.headers, &self.bearer_tokens)?,
        };

        let codec = match self.ids {
            Some(ids) => JsonRpcCodec::new(ids),
            None => JsonRpcCodec::default(),
        };

        Ok(A2AClient::from_parts(transport, store, codec, self.config))
    }
}

#[cfg(feature = "http")]
fn default_transport(
    timeout: Option<Duration>,
    headers: &[(String, String)],
    bearer_tokens: &[(String, String)],
) -> A2AResult<Arc<dyn Transport>> {
    use crate::client::{HttpTransport, TransportConfig};

    let mut config = TransportConfig::default();
    if let Some(timeout) = timeout {
        config.timeout = timeout;
    }
    config.headers.extend(headers.iter().cloned());

    let transport = bearer_tokens
        .iter()
        .fold(HttpTransport::with_config(config), |t, (key, token)| {
            t.with_bearer_token(key, token)
        });
    Ok(Arc::new(transport))
}

#[cfg(not(feature = "http"))]
fn default_transport(
    _timeout: Option<Duration>,
    _headers: &[(String, String)],
    _bearer_tokens: &[(String, String)],
) -> A2AResult<Arc<dyn Transport>> {
    Err(A2AError::invalid_input(
        "no transport supplied and the `http` feature is disabled",
    ))
}
