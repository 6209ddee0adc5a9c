//! Transport layer for A2A client communication.
//!
//! Provides the [`Transport`] trait that the task engine and card resolver
//! talk to, and (with the `http` feature) [`HttpTransport`], the reqwest
//! binding for JSON-RPC over HTTP(S).

use async_trait::async_trait;

use crate::error::TransportFailure;
use crate::types::AuthScheme;

/// Delivery capability consumed by the client core.
///
/// Implementations own connection handling, TLS and header construction. The
/// core only hands over an endpoint, an optional [`AuthScheme`] and encoded
/// bytes, and expects classified [`TransportFailure`]s back.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST an encoded JSON-RPC request to `endpoint` and return the raw
    /// response body.
    async fn deliver(
        &self,
        endpoint: &str,
        auth: Option<&AuthScheme>,
        body: Vec<u8>,
    ) -> Result<Vec<u8>, TransportFailure>;

    /// Plain unauthenticated GET, used for agent card discovery.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportFailure>;
}

#[cfg(feature = "http")]
pub use http::{HttpTransport, TransportConfig};

#[cfg(feature = "http")]
mod http {
    use std::collections::HashMap;
    use std::time::Duration;

    use async_trait::async_trait;
    use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
    use tracing::{debug, warn};

    use super::Transport;
    use crate::error::TransportFailure;
    use crate::types::AuthScheme;

    /// Configuration for [`HttpTransport`].
    #[derive(Debug, Clone)]
    pub struct TransportConfig {
        /// Request timeout. Defaults to 60 seconds.
        pub timeout: Duration,
        /// Additional HTTP headers to include on every request.
        pub headers: HashMap<String, String>,
    }

    impl Default for TransportConfig {
        fn default() -> Self {
            Self {
                timeout: Duration::from_secs(60),
                headers: HashMap::new(),
            }
        }
    }

    /// JSON-RPC over HTTP transport using `reqwest`.
    ///
    /// Requests are sent as `POST` with `Content-Type: application/json`.
    /// When a call carries an [`AuthScheme`], the bearer token registered for
    /// that scheme's credential key (see [`with_bearer_token`]) is attached.
    /// Tokens are obtained by the caller; this transport never fetches them.
    ///
    /// [`with_bearer_token`]: HttpTransport::with_bearer_token
    ///
    /// # Example
    ///
    /// ```no_run
    /// use a2a_tasks::client::HttpTransport;
    ///
    /// let transport = HttpTransport::new().with_bearer_token("my-client-id", "token-123");
    /// ```
    #[derive(Debug, Clone)]
    pub struct HttpTransport {
        client: reqwest::Client,
        tokens: HashMap<String, String>,
    }

    impl HttpTransport {
        /// Create a transport with default configuration (60s timeout).
        pub fn new() -> Self {
            Self::with_config(TransportConfig::default())
        }

        /// Create a transport with custom configuration.
        pub fn with_config(config: TransportConfig) -> Self {
            let mut default_headers = HeaderMap::new();
            for (key, value) in &config.headers {
                match (
                    HeaderName::from_bytes(key.as_bytes()),
                    HeaderValue::from_str(value),
                ) {
                    (Ok(name), Ok(val)) => {
                        default_headers.insert(name, val);
                    }
                    _ => warn!(header = %key, "Skipping invalid default header"),
                }
            }

            let client = reqwest::Client::builder()
                .timeout(config.timeout)
                .default_headers(default_headers)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new());

            Self::with_client(client)
        }

        /// Create a transport with an existing `reqwest::Client`.
        ///
        /// Useful when you want to share a connection pool or configure TLS
        /// settings externally.
        pub fn with_client(client: reqwest::Client) -> Self {
            Self {
                client,
                tokens: HashMap::new(),
            }
        }

        /// Register a bearer token for calls whose auth scheme has the given
        /// credential key (the OAuth2 client id).
        pub fn with_bearer_token(mut self, credential_key: &str, token: &str) -> Self {
            self.tokens
                .insert(credential_key.to_string(), token.to_string());
            self
        }

        fn bearer_for(&self, auth: Option<&AuthScheme>) -> Option<&str> {
            let scheme = auth?;
            let token = self.tokens.get(scheme.credential_key());
            if token.is_none() {
                debug!(
                    scheme = scheme.kind(),
                    key = scheme.credential_key(),
                    "No credential registered for auth scheme"
                );
            }
            token.map(String::as_str)
        }

        async fn read_body(response: reqwest::Response) -> Result<Vec<u8>, TransportFailure> {
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(TransportFailure::Http {
                    status: status.as_u16(),
                    body,
                });
            }
            response
                .bytes()
                .await
                .map(|b| b.to_vec())
                .map_err(|e| classify(e, "failed to read response body"))
        }
    }

    impl Default for HttpTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    /// Map a reqwest error onto the retry classification.
    fn classify(e: reqwest::Error, context: &str) -> TransportFailure {
        if e.is_timeout() {
            TransportFailure::Timeout(format!("{context}: {e}"))
        } else if e.is_connect() {
            TransportFailure::ConnectionRefused(format!("{context}: {e}"))
        } else {
            TransportFailure::Other(format!("{context}: {e}"))
        }
    }

    #[async_trait]
    impl Transport for HttpTransport {
        async fn deliver(
            &self,
            endpoint: &str,
            auth: Option<&AuthScheme>,
            body: Vec<u8>,
        ) -> Result<Vec<u8>, TransportFailure> {
            let mut request = self
                .client
                .post(endpoint)
                .header("Content-Type", "application/json")
                .body(body);
            if let Some(token) = self.bearer_for(auth) {
                request = request.header(AUTHORIZATION, format!("Bearer {token}"));
            }

            let response = request
                .send()
                .await
                .map_err(|e| classify(e, "JSON-RPC request failed"))?;
            Self::read_body(response).await
        }

        async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportFailure> {
            let response = self
                .client
                .get(url)
                .header("Accept", "application/json")
                .send()
                .await
                .map_err(|e| classify(e, "GET request failed"))?;
            Self::read_body(response).await
        }
    }
}
