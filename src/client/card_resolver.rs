//! Agent card discovery and resolution.
//!
//! Implements the well-known URI convention: the card lives at a fixed path
//! under the agent's origin. Cards are fetched on every call; callers that
//! want caching wrap the resolver themselves.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;
use url::Url;

use crate::error::{A2AError, A2AResult, TransportFailure};
use crate::types::AgentCard;

use super::transport::Transport;

/// Default path for the agent card well-known endpoint.
pub const AGENT_CARD_WELL_KNOWN_PATH: &str = "/.well-known/agent-card.json";

/// Previous well-known path, tried when the default answers 404.
pub const PREV_AGENT_CARD_WELL_KNOWN_PATH: &str = "/.well-known/agent.json";

/// Resolves [`AgentCard`]s from agent URIs.
///
/// The fetch is a plain GET through the [`Transport`] with no auth scheme,
/// since the card itself is what advertises the scheme.
#[derive(Clone)]
pub struct CardResolver {
    transport: Arc<dyn Transport>,
    /// Override the default card path. Disables the fallback path.
    card_path: Option<String>,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for CardResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardResolver")
            .field("card_path", &self.card_path)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl CardResolver {
    /// Create a resolver fetching through `transport`.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            card_path: None,
            timeout: None,
        }
    }

    /// Override the agent card path.
    pub fn with_card_path(mut self, path: impl Into<String>) -> Self {
        self.card_path = Some(path.into());
        self
    }

    /// Bound each discovery call.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the card URL for `agent_uri` and `path`: the path replaces
    /// whatever path, query and fragment the URI carried.
    pub fn card_url(agent_uri: &str, path: &str) -> A2AResult<String> {
        let parsed = Url::parse(agent_uri)
            .map_err(|e| A2AError::invalid_input(format!("invalid agent URI '{agent_uri}': {e}")))?;
        if !parsed.has_host() {
            return Err(A2AError::invalid_input(format!(
                "agent URI '{agent_uri}' has no host"
            )));
        }
        let origin = parsed.origin().ascii_serialization();
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        Ok(format!("{origin}{path}"))
    }

    /// Fetch and parse the agent card for `agent_uri`.
    ///
    /// With the default path, a 404 from `/.well-known/agent-card.json` falls
    /// back to `/.well-known/agent.json`.
    ///
    /// # Errors
    ///
    /// [`A2AError::AgentUnreachable`] on any transport failure,
    /// [`A2AError::MalformedAgentCard`] when the body is not a valid card and
    /// [`A2AError::InvalidInput`] when `agent_uri` is not an absolute URL.
    pub async fn resolve(&self, agent_uri: &str) -> A2AResult<AgentCard> {
        // One deadline covers the primary fetch and the fallback together.
        let deadline = self.timeout.map(|limit| Instant::now() + limit);

        if let Some(path) = &self.card_path {
            return self
                .fetch_card(&Self::card_url(agent_uri, path)?, deadline)
                .await;
        }

        let primary = Self::card_url(agent_uri, AGENT_CARD_WELL_KNOWN_PATH)?;
        match self.fetch_card(&primary, deadline).await {
            Err(A2AError::AgentUnreachable {
                source: TransportFailure::Http { status: 404, .. },
                ..
            }) => {
                let fallback = Self::card_url(agent_uri, PREV_AGENT_CARD_WELL_KNOWN_PATH)?;
                debug!(
                    "agent card not found at {}, trying fallback {}",
                    primary, fallback
                );
                self.fetch_card(&fallback, deadline).await
            }
            other => other,
        }
    }

    async fn fetch_card(&self, url: &str, deadline: Option<Instant>) -> A2AResult<AgentCard> {
        debug!("resolving agent card from {}", url);

        let fetched = match (deadline, self.timeout) {
            (Some(deadline), Some(limit)) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                let elapsed = || -> Result<Vec<u8>, TransportFailure> {
                    Err(TransportFailure::Timeout(format!(
                        "no agent card within {}ms",
                        limit.as_millis()
                    )))
                };
                if remaining.is_zero() {
                    elapsed()
                } else {
                    tokio::time::timeout(remaining, self.transport.fetch(url))
                        .await
                        .unwrap_or_else(|_| elapsed())
                }
            }
            _ => self.transport.fetch(url).await,
        };
        let bytes = fetched.map_err(|source| A2AError::AgentUnreachable {
            url: url.to_string(),
            source,
        })?;

        let card: AgentCard =
            serde_json::from_slice(&bytes).map_err(|e| A2AError::MalformedAgentCard {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        validate_card(&card).map_err(|message| A2AError::MalformedAgentCard {
            url: url.to_string(),
            message,
        })?;

        debug!(
            agent = %card.name,
            actions = card.actions.len(),
            "resolved agent card"
        );
        Ok(card)
    }
}

fn validate_card(card: &AgentCard) -> Result<(), String> {
    if card.name.trim().is_empty() {
        return Err("agent name is empty".to_string());
    }
    Url::parse(&card.endpoint).map_err(|e| format!("invalid endpoint '{}': {e}", card.endpoint))?;
    if let Some(action) = card.actions.iter().find(|a| a.name.trim().is_empty()) {
        return Err(format!("action with empty name: {action:?}"));
    }
    Ok(())
}
