//! HTTP transport and full client round trips against a mock HTTP agent.

#![cfg(feature = "http")]

use std::sync::Arc;
use std::time::Duration;

use a2a_tasks::builders::{AgentCardBuilder, ClientBuilder};
use a2a_tasks::client::{HttpTransport, RetryPolicy, Transport, TransportConfig};
use a2a_tasks::error::{A2AError, TransportFailure};
use a2a_tasks::store::{InMemoryTaskStore, TaskStore};
use a2a_tasks::types::*;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Responds like a tiny A2A agent: `tasks/create` acknowledges `t-1`,
/// `tasks/get` reports it completed.
fn agent_responder(request: &Request) -> ResponseTemplate {
    let body: Value = match request.body_json() {
        Ok(body) => body,
        Err(_) => return ResponseTemplate::new(400),
    };
    let result = match body["method"].as_str() {
        Some("tasks/create") => json!({"id": "t-1", "status": "submitted"}),
        Some("tasks/get") => json!({
            "id": body["params"]["id"],
            "status": "completed",
            "result": {"summary": "short"}
        }),
        _ => {
            return ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": body["id"],
                "error": {"code": -32601, "message": "Method not found"}
            }))
        }
    };
    ResponseTemplate::new(200).set_body_json(json!({
        "jsonrpc": "2.0",
        "id": body["id"],
        "result": result
    }))
}

fn card_for(server: &MockServer) -> AgentCard {
    AgentCardBuilder::new("Summarizer", format!("{}/rpc", server.uri()))
        .with_action("summarize", "Summarize a text")
        .build()
}

fn oauth(client_id: &str) -> AuthScheme {
    AuthScheme::OAuth2 {
        client_id: client_id.to_string(),
        authorization_url: "https://auth.example/authorize".into(),
        token_url: "https://auth.example/token".into(),
        scopes: vec![],
    }
}

// ============================================================================
// Transport classification
// ============================================================================

#[tokio::test]
async fn test_deliver_posts_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rpc"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new();
    let body = transport
        .deliver(&format!("{}/rpc", server.uri()), None, b"{}".to_vec())
        .await
        .unwrap();
    assert_eq!(body, b"{}");
}

#[tokio::test]
async fn test_bearer_token_attached_for_scheme() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new().with_bearer_token("client-1", "secret-token");
    let scheme = oauth("client-1");
    let body = transport
        .deliver(&format!("{}/rpc", server.uri()), Some(&scheme), Vec::new())
        .await
        .unwrap();
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn test_unknown_credential_sends_no_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(|request: &Request| {
            if request.headers.contains_key("authorization") {
                ResponseTemplate::new(400)
            } else {
                ResponseTemplate::new(200)
            }
        })
        .mount(&server)
        .await;

    let transport = HttpTransport::new().with_bearer_token("client-1", "secret-token");
    let scheme = oauth("someone-else");
    let result = transport
        .deliver(&format!("{}/rpc", server.uri()), Some(&scheme), Vec::new())
        .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_status_codes_are_classified() {
    let server = MockServer::start().await;
    Mock::given(path("/unavailable"))
        .respond_with(ResponseTemplate::new(503).set_body_string("try later"))
        .mount(&server)
        .await;
    Mock::given(path("/forbidden"))
        .respond_with(ResponseTemplate::new(403).set_body_string("no"))
        .mount(&server)
        .await;

    let transport = HttpTransport::new();

    let unavailable = transport
        .deliver(&format!("{}/unavailable", server.uri()), None, Vec::new())
        .await
        .unwrap_err();
    assert_eq!(
        unavailable,
        TransportFailure::Http {
            status: 503,
            body: "try later".into()
        }
    );
    assert!(unavailable.is_retryable());

    let forbidden = transport
        .fetch(&format!("{}/forbidden", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(forbidden.status(), Some(403));
    assert!(!forbidden.is_retryable());
}

#[tokio::test]
async fn test_slow_response_is_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let transport = HttpTransport::with_config(TransportConfig {
        timeout: Duration::from_millis(100),
        ..TransportConfig::default()
    });
    let err = transport
        .deliver(&format!("{}/rpc", server.uri()), None, Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, TransportFailure::Timeout(_)), "got {err:?}");
}

#[tokio::test]
async fn test_closed_port_is_connection_refused() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = HttpTransport::new()
        .deliver(&format!("http://{addr}/rpc"), None, Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, TransportFailure::ConnectionRefused(_)), "got {err:?}");
    assert!(err.is_retryable());
}

// ============================================================================
// Client over HTTP
// ============================================================================

#[tokio::test]
async fn test_discovery_and_task_round_trip() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/agent-card.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(card_for(&server)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rpc"))
        .respond_with(agent_responder)
        .expect(2)
        .mount(&server)
        .await;

    let store = Arc::new(InMemoryTaskStore::new());
    let client = ClientBuilder::new()
        .with_store(store.clone())
        .with_call_deadline(Duration::from_secs(10))
        .build()?;

    let card = client.discover_agent(&format!("{}/", server.uri())).await?;
    let task = client
        .create_task(&card, "summarize", json!({"text": "long text"}))
        .await?;
    assert_eq!(task.status, TaskState::Submitted);

    let task = client.get_task_status(&task).await?;
    assert_eq!(task.status, TaskState::Completed);
    assert_eq!(task.result, Some(json!({"summary": "short"})));
    assert_eq!(store.find_by_id("t-1").await?, Some(task));
    Ok(())
}

#[tokio::test]
async fn test_discovery_falls_back_to_legacy_path() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/agent.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(card_for(&server)))
        .expect(1)
        .mount(&server)
        .await;

    let client = ClientBuilder::new()
        .with_store(Arc::new(InMemoryTaskStore::new()))
        .build()?;
    let card = client.discover_agent(&server.uri()).await?;
    assert_eq!(card.name, "Summarizer");
    Ok(())
}

#[tokio::test]
async fn test_server_errors_are_retried_over_http() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "tasks/create"})))
        .respond_with(agent_responder)
        .expect(1)
        .mount(&server)
        .await;

    let client = ClientBuilder::new()
        .with_store(Arc::new(InMemoryTaskStore::new()))
        .with_retry_policy(RetryPolicy {
            initial_backoff: Duration::from_millis(10),
            ..RetryPolicy::default()
        })
        .build()?;

    let task = client
        .create_task(&card_for(&server), "summarize", json!({}))
        .await?;
    assert_eq!(task.id, "t-1");
    Ok(())
}

#[tokio::test]
async fn test_bad_request_is_not_retried_over_http() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad"))
        .expect(1)
        .mount(&server)
        .await;

    let client = ClientBuilder::new()
        .with_store(Arc::new(InMemoryTaskStore::new()))
        .build()?;
    let err = client
        .create_task(&card_for(&server), "summarize", json!({}))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        A2AError::TransportRejected(TransportFailure::Http { status: 400, .. })
    ));
    Ok(())
}

#[tokio::test]
async fn test_builder_tokens_reach_the_agent() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("authorization", "Bearer builder-token"))
        .and(header("x-tenant", "acme"))
        .respond_with(agent_responder)
        .expect(1)
        .mount(&server)
        .await;

    let card = AgentCardBuilder::new("Secure", format!("{}/rpc", server.uri()))
        .with_action("summarize", "Summarize")
        .with_auth_scheme(oauth("client-1"))
        .build();
    let client = ClientBuilder::new()
        .with_store(Arc::new(InMemoryTaskStore::new()))
        .with_bearer_token("client-1", "builder-token")
        .with_header("x-tenant", "acme")
        .build()?;

    let task = client.create_task(&card, "summarize", json!({})).await?;
    assert_eq!(task.agent.auth_scheme, Some(oauth("client-1")));
    Ok(())
}
